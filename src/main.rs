//! Turnover predictor - Main Entry Point
//!
//! With no arguments, trains on `data/employee_data.csv` and writes
//! `models/turnover_model.bin`.

use clap::Parser;
use turnover_predictor::cli::{cmd_evaluate, cmd_run, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "turnover_predictor=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Evaluate { model, data }) => cmd_evaluate(model, data)?,
        None => cmd_run(&cli)?,
    }

    Ok(())
}
