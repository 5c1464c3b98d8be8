//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Regflow: runs the bot registration flow against the messaging web client
#[derive(Parser, Debug)]
#[command(name = "regflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Emit log events as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scenario in a real browser
    ///
    /// The browser window stays visible by default: the one-time login code
    /// has to be typed into it by a person while the run waits.
    Run(RunArgs),

    /// Validate a scenario and list its steps without a browser
    Steps(StepsArgs),

    /// Show the effective settings (password redacted)
    Config(ConfigArgs),
}

/// Settings file and environment
#[derive(Parser, Debug, Clone)]
pub struct SettingsArgs {
    /// Settings file (YAML); REGFLOW_* variables override its values
    #[arg(short, long, default_value = "regflow.yaml", env = "REGFLOW_SETTINGS")]
    pub settings: PathBuf,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Settings source
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Scenario file (YAML); defaults to the built-in registration journey
    #[arg(long)]
    pub scenario: Option<PathBuf>,

    /// Directory for report.json and failure screenshots
    #[arg(short, long, default_value = "target/regflow")]
    pub report_dir: PathBuf,

    /// Run chromium headless (the code step then needs another way in)
    #[arg(long)]
    pub headless: bool,

    /// Path to the chromium binary
    #[arg(long)]
    pub chromium: Option<PathBuf>,

    /// Disable the chromium sandbox (containers)
    #[arg(long)]
    pub no_sandbox: bool,
}

/// Arguments for the steps command
#[derive(Parser, Debug)]
pub struct StepsArgs {
    /// Settings source
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Scenario file (YAML); defaults to the built-in registration journey
    #[arg(long)]
    pub scenario: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Settings source
    #[command(flatten)]
    pub settings: SettingsArgs,
}

/// Color argument for CLI
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum ColorArg {
    /// Auto-detect
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::ColorChoice;

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_defaults() {
        let cli = Cli::try_parse_from(["regflow", "run"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.settings.settings, PathBuf::from("regflow.yaml"));
                assert_eq!(args.report_dir, PathBuf::from("target/regflow"));
                assert!(!args.headless);
                assert!(args.scenario.is_none());
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "regflow",
            "steps",
            "--settings",
            "ci.yaml",
            "-vv",
            "--log-json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.log_json);
        assert!(matches!(cli.command, Commands::Steps(_)));
    }

    #[test]
    fn test_color_arg_conversion() {
        assert_eq!(ColorChoice::from(ColorArg::Never), ColorChoice::Never);
        assert_eq!(ColorChoice::from(ColorArg::Always), ColorChoice::Always);
        assert_eq!(ColorChoice::from(ColorArg::Auto), ColorChoice::Auto);
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["regflow"]).is_err());
    }
}
