//! Regflow CLI library
//!
//! Command-line front end for the regflow registration flow: argument
//! parsing, logging setup, console progress and the command implementations.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
pub mod logging;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, Commands, ConfigArgs, RunArgs, SettingsArgs, StepsArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::ConsoleReporter;
pub use runner::{redacted_settings, run_config, run_scenario, run_steps, RunPlan};
