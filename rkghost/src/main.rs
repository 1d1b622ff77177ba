mod cli;
mod config;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use libghost::{
    InjectionOutcome, KubectlClient, LifecycleController, LogSink, SeededSource, SelectionPolicy,
};
use tracing::info;

use crate::cli::Cli;
use crate::config::GHOST_CONFIG;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let log_path = cli
        .log_file
        .clone()
        .unwrap_or_else(|| GHOST_CONFIG.log_file());
    let sink = LogSink::open(&log_path, cli.log_format, "debug")
        .with_context(|| format!("Failed to open log file at {}", log_path.display()))?;

    let outcome = sink.scope(inject(&cli, sink.path())).await;
    println!("{}", outcome.message());

    if fails_run(&outcome, cli.fail_on_error) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Run one injection cycle with the configured cluster client.
async fn inject(cli: &Cli, log_file: &Path) -> InjectionOutcome {
    let kubectl = cli
        .kubectl
        .clone()
        .unwrap_or_else(|| GHOST_CONFIG.kubectl.clone());
    info!(
        kubectl = %kubectl.display(),
        wait_secs = ?cli.time_to_ghost,
        seed = ?cli.seed,
        log_file = %log_file.display(),
        "starting fault injection",
    );

    let client = KubectlClient::new(kubectl)
        .kubeconfig(cli.kubeconfig.clone())
        .context(cli.context.clone());

    LifecycleController::new(
        Arc::new(client),
        SelectionPolicy::new(SeededSource::new(cli.seed)),
        cli.wait(),
    )
    .on_progress(|progress| println!("{progress}"))
    .run()
    .await
}

/// Every run exits 0 unless `--fail-on-error` was given and a mutation or
/// inventory query failed.
fn fails_run(outcome: &InjectionOutcome, fail_on_error: bool) -> bool {
    fail_on_error && outcome.is_failure()
}
