//! Command implementations

use std::path::{Path, PathBuf};

use regflow::{RegflowResult, Scenario, Settings};
use tracing::warn;
use serde_json::Value;

use crate::commands::{ConfigArgs, RunArgs, StepsArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

/// Settings plus the resolved, validated scenario
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Effective settings
    pub settings: Settings,
    /// Scenario with placeholders filled in
    pub scenario: Scenario,
}

impl RunPlan {
    /// Load settings and either the scenario file or the built-in journey
    pub fn load(settings: &Path, scenario: Option<&Path>) -> CliResult<Self> {
        let settings = Settings::load(settings)?;
        let scenario = match scenario {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    CliError::config(format!("cannot read {}: {e}", path.display()))
                })?;
                Scenario::from_yaml(&text)?.resolve(&settings)?
            }
            None => Scenario::registration(&settings),
        };
        scenario.validate()?;
        Ok(Self { settings, scenario })
    }

    /// Numbered step labels
    #[must_use]
    pub fn step_lines(&self) -> Vec<String> {
        self.scenario
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| format!("{:>2}. {}", i + 1, step.label()))
            .collect()
    }
}

/// Settings as JSON with the password masked
pub fn redacted_settings(settings: &Settings) -> CliResult<Value> {
    let mut value = serde_json::to_value(settings)?;
    if let Some(password) = value.get_mut("password") {
        *password = Value::String("<redacted>".to_string());
    }
    Ok(value)
}

/// `regflow steps`
pub fn run_steps(args: &StepsArgs) -> CliResult<()> {
    let plan = RunPlan::load(&args.settings.settings, args.scenario.as_deref())?;
    println!("{} ({} steps)", plan.scenario.name, plan.scenario.len());
    for line in plan.step_lines() {
        println!("{line}");
    }
    Ok(())
}

/// `regflow config`
pub fn run_config(args: &ConfigArgs) -> CliResult<()> {
    let settings = Settings::load(&args.settings.settings)?;
    println!("{}", serde_json::to_string_pretty(&redacted_settings(&settings)?)?);
    Ok(())
}

/// Combine the scenario outcome with the report write.
///
/// A scenario failure is returned even when the report could not be written;
/// the write error is only logged then.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn settle<T>(outcome: RegflowResult<T>, written: RegflowResult<PathBuf>) -> CliResult<PathBuf> {
    match (outcome, written) {
        (Ok(_), written) => Ok(written?),
        (Err(err), Ok(_)) => Err(err.into()),
        (Err(err), Err(write_err)) => {
            warn!(error = %write_err, "report could not be written");
            Err(err.into())
        }
    }
}

/// Browser configuration from run flags
#[cfg(feature = "browser")]
fn browser_config(args: &RunArgs) -> regflow::BrowserConfig {
    let mut config = regflow::BrowserConfig::default().with_headless(args.headless);
    if let Some(path) = &args.chromium {
        config = config.with_chromium_path(path.to_string_lossy());
    }
    if args.no_sandbox {
        config = config.with_no_sandbox();
    }
    config
}

/// `regflow run`: launch chromium, run the scenario, write the report
#[cfg(feature = "browser")]
pub async fn run_scenario(config: &CliConfig, args: &RunArgs) -> CliResult<PathBuf> {
    use regflow::{run_in_session, CdpSession, JsonReporter};
    use tracing::info;

    use crate::output::ConsoleReporter;

    let plan = RunPlan::load(&args.settings.settings, args.scenario.as_deref())?;
    let mut console = ConsoleReporter::new(
        config.color.should_color(),
        config.verbosity.is_quiet(),
    );
    let mut report = JsonReporter::new(plan.scenario.name.clone());
    let mut session = CdpSession::new(browser_config(args));
    info!(run_id = %report.run_id(), scenario = %plan.scenario.name, "run started");

    let outcome = run_in_session(
        &mut session,
        &plan.settings,
        &plan.scenario,
        (&mut console, &mut report),
    )
    .await;

    let written = report.write(&args.report_dir);
    if let Ok(path) = &written {
        info!(report = %path.display(), "report written");
    }
    console.summary(&report.summary(), outcome.is_ok());
    settle(outcome, written)
}

/// `regflow run` without browser support
#[cfg(not(feature = "browser"))]
pub async fn run_scenario(_config: &CliConfig, _args: &RunArgs) -> CliResult<PathBuf> {
    Err(CliError::BrowserUnavailable)
}
