mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use csvlake_core::config::load_dotenv;

use crate::cli::{CliArgs, Command};

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = args.stack_config();
    config.log_summary();
    debug!(command = ?args.command, "dispatching");

    match args.command {
        Command::Synth => commands::synth_cmd(&config).await,
        Command::Validate => commands::validate_cmd(&config).await,
        Command::Deploy { dry_run } => commands::deploy_cmd(&config, dry_run).await,
        Command::Destroy => commands::destroy_cmd(&config).await,
        Command::Outputs => commands::outputs_cmd(&config).await,
        Command::Status => commands::status_cmd(&config).await,
        Command::Query {
            sql,
            timeout_secs,
            json,
        } => commands::query_cmd(&config, &sql, timeout_secs, json).await,
    }
}
