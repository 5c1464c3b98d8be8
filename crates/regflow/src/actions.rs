//! Shared UI context for page objects: a waiter plus the configured budgets.

use std::time::Duration;

use tracing::debug;

use crate::config::Timeouts;
use crate::driver::{Effect, PageDriver};
use crate::locator::{LogicalElement, NodePath, Resolved};
use crate::result::RegflowResult;
use crate::wait::{Predicate, WaitCondition, Waiter};

/// Tags that wrap the clickable region instead of being it
pub const WRAPPER_TAGS: [&str; 2] = ["span", "label"];

/// Node a click on `resolved` should land on.
///
/// Text wrappers are redirected to their structural parent; anything else is
/// clicked directly.
#[must_use]
pub fn click_target(resolved: &Resolved) -> NodePath {
    if WRAPPER_TAGS.contains(&resolved.state.tag.as_str()) {
        resolved.path.parent()
    } else {
        resolved.path.clone()
    }
}

/// Everything a page object needs to act on the page
#[derive(Debug, Clone, Copy)]
pub struct Ui<'d> {
    waiter: Waiter<'d>,
    timeouts: Timeouts,
}

impl<'d> Ui<'d> {
    /// Bind a driver and budgets
    #[must_use]
    pub fn new(driver: &'d dyn PageDriver, timeouts: Timeouts) -> Self {
        Self {
            waiter: Waiter::new(driver, timeouts.wait_options()),
            timeouts,
        }
    }

    /// Configured budgets
    #[must_use]
    pub const fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// The underlying driver
    #[must_use]
    pub fn driver(&self) -> &'d dyn PageDriver {
        self.waiter.driver()
    }

    /// The waiter
    #[must_use]
    pub const fn waiter(&self) -> &Waiter<'d> {
        &self.waiter
    }

    /// Wait for `predicate` and return the node it held on
    pub async fn wait(
        &self,
        element: &LogicalElement,
        predicate: Predicate,
        timeout: Duration,
    ) -> RegflowResult<Resolved> {
        let condition = WaitCondition::new(element.clone(), predicate, timeout);
        self.waiter
            .await_condition(&condition)
            .await?
            .into_resolved(element.role())
    }

    /// Wait visible, then click with wrapper redirection
    pub async fn click(&self, element: &LogicalElement, timeout: Duration) -> RegflowResult<()> {
        let condition = WaitCondition::new(element.clone(), Predicate::Visible, timeout);
        let resolved = self
            .waiter
            .perform(&condition, &[Effect::Click], click_target)
            .await?;
        debug!(role = element.role(), tag = %resolved.state.tag, "clicked");
        Ok(())
    }

    /// Wait for `predicate`, then apply `effects` to the node itself
    pub async fn apply(
        &self,
        element: &LogicalElement,
        predicate: Predicate,
        effects: &[Effect],
        timeout: Duration,
    ) -> RegflowResult<Resolved> {
        let condition = WaitCondition::new(element.clone(), predicate, timeout);
        self.waiter
            .perform(&condition, effects, |r| r.path.clone())
            .await
    }

    /// Wait until the element accepts input, then apply `effects` to it
    pub async fn edit(
        &self,
        element: &LogicalElement,
        effects: &[Effect],
        timeout: Duration,
    ) -> RegflowResult<Resolved> {
        self.apply(element, Predicate::Editable, effects, timeout)
            .await
    }

    /// Wait until the element accepts input, then type `text`
    pub async fn type_into(
        &self,
        element: &LogicalElement,
        text: &str,
        timeout: Duration,
    ) -> RegflowResult<()> {
        self.edit(element, &[Effect::Type(text.to_string())], timeout)
            .await
            .map(|_| ())
    }

    /// Single non-waiting lookup
    pub async fn find(&self, element: &LogicalElement) -> RegflowResult<Option<Resolved>> {
        crate::locator::resolve_once(self.driver(), element).await
    }
}
