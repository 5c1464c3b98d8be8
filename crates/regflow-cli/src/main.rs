//! Regflow CLI: run the bot registration flow from the command line
//!
//! ## Usage
//!
//! ```bash
//! regflow steps --settings regflow.yaml         # Validate and list steps
//! regflow config                                # Effective settings
//! regflow run --report-dir target/regflow       # Run in chromium
//! ```

use clap::Parser;
use regflow_cli::{
    logging, run_config, run_scenario, run_steps, Cli, CliConfig, CliResult, Commands, Verbosity,
};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    logging::init(&config)?;

    match cli.command {
        Commands::Run(args) => {
            let report = run_scenario(&config, &args).await?;
            if !config.verbosity.is_quiet() {
                println!("Report: {}", report.display());
            }
            Ok(())
        }
        Commands::Steps(args) => run_steps(&args),
        Commands::Config(args) => run_config(&args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
        .with_log_json(cli.log_json)
}
