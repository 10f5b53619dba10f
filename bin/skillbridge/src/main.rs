//! skillbridge deploys a compiled contract to Hedera's EVM in one shot.

mod cli;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use cli::Cli;
use skillbridge_deploy::{EnvSource, Orchestrator, Progress, RpcConnector, report};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize the logger. Stdout is reserved for the deployment report.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(std::io::stderr)
        .init();

    load_env_file(&cli)?;

    let artifact = cli.artifact_file();
    tracing::info!(
        artifact = %artifact.path().display(),
        settings = ?cli.client_settings(),
        "Starting deployment"
    );

    let orchestrator = Orchestrator::new(RpcConnector::new(cli.client_settings()), artifact);
    let mut progress = |event: &Progress| println!("{}", report::progress_line(event));
    let deployment = orchestrator.run(&EnvSource, &mut progress).await;

    let summary = report::render(&deployment);
    if deployment.outcome.is_success() {
        print!("{summary}");
        Ok(ExitCode::SUCCESS)
    } else {
        eprint!("{summary}");
        Ok(ExitCode::FAILURE)
    }
}

/// Load the dotenv file without overriding variables that are already set.
///
/// A missing default `.env` is fine; a missing explicit file is an error.
fn load_env_file(cli: &Cli) -> Result<()> {
    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load env file {}", path.display()))?;
            tracing::debug!(path = %path.display(), "Loaded env file");
        }
        None => match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded env file"),
            Err(e) if e.not_found() => tracing::debug!("No .env file found"),
            Err(e) => return Err(e).context("Failed to load .env file"),
        },
    }

    Ok(())
}
