//! Browser session bootstrap and teardown.
//!
//! A [`BrowserSession`] owns the single browser context of a run. Page objects
//! only borrow its driver. [`run_in_session`] opens the session, runs a
//! scenario and always closes it afterwards, whatever the outcome.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::actions::Ui;
use crate::config::Settings;
use crate::driver::PageDriver;
use crate::reporter::StepReporter;
use crate::result::RegflowResult;
use crate::scenario::{Orchestrator, RunSummary, Scenario};

/// Owner of the browser context for one run
#[async_trait]
pub trait BrowserSession: Send {
    /// Start the browser if needed and navigate to `url`
    ///
    /// # Errors
    ///
    /// Returns an error if the browser cannot be started or the page not loaded.
    async fn open(&mut self, url: &str) -> RegflowResult<()>;

    /// Driver for the open page
    fn driver(&self) -> &dyn PageDriver;

    /// Dispose of the browser context
    ///
    /// # Errors
    ///
    /// Returns an error if shutdown fails; the session is unusable either way.
    async fn close(&mut self) -> RegflowResult<()>;
}

/// Open `settings.base_url`, run `scenario`, then close the session.
///
/// The scenario is validated before the session is opened. Teardown runs even
/// when opening or a step fails; if both the scenario and teardown fail, the
/// scenario error is returned and the teardown error is logged.
pub async fn run_in_session<S, R>(
    session: &mut S,
    settings: &Settings,
    scenario: &Scenario,
    reporter: R,
) -> RegflowResult<RunSummary>
where
    S: BrowserSession + ?Sized,
    R: StepReporter,
{
    scenario.validate()?;

    let outcome = match session.open(&settings.base_url).await {
        Ok(()) => {
            info!(url = %settings.base_url, "session opened");
            let ui = Ui::new(session.driver(), settings.timeouts);
            Orchestrator::new(ui, reporter).run(scenario).await
        }
        Err(err) => Err(err),
    };

    let closed = session.close().await;
    match (outcome, closed) {
        (Ok(summary), Ok(())) => {
            info!("session closed");
            Ok(summary)
        }
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            warn!(error = %close_err, "session teardown failed after scenario failure");
            Err(err)
        }
    }
}
