//! Main entry point for bt-recover CLI

use anyhow::Context;
use bt_recover::cli::{Args, OutputFormatter};
use bt_recover::core::resolver::probe_version;
use bt_recover::{
    BtRecoverError, DownloadInvoker, ExecutableResolver, OutcomeStatus, StreamUrlValidator,
    Verbosity,
};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Where a run is; failures are reported against the stage they happened in
#[derive(Debug, Clone, Copy)]
enum Stage {
    Validating,
    ResolvingExecutable,
    Invoking,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments (exits on --help/--version/usage errors)
    let args = Args::parse();
    let verbosity = args.verbosity_level();

    if let Err(e) = init_logging(verbosity) {
        eprintln!("Unexpected error: {:#}", e);
        return ExitCode::FAILURE;
    }

    debug!("Starting bt-recover with args: {:?}", args);

    let formatter = Arc::new(OutputFormatter::new(verbosity));

    match run(&args, formatter.clone()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err((stage, e)) => {
            debug!(stage = ?stage, kind = %e.kind(), "Run failed");
            formatter.error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

/// Validate, resolve, invoke; the first failure ends the run
async fn run(args: &Args, formatter: Arc<OutputFormatter>) -> Result<(), (Stage, BtRecoverError)> {
    let start_time = Instant::now();
    let request = args.to_request();

    debug!("Validating URL...");
    let validator = StreamUrlValidator::with_timeout(args.timeout_duration())
        .map_err(|e| (Stage::Validating, e))?
        .with_probe(!args.no_probe);
    let validated = validator
        .validate(&request.source_url)
        .await
        .map_err(|e| (Stage::Validating, BtRecoverError::from(e)))?;
    if let Some(report) = &validated.probe {
        formatter.print_probe_report(report);
    }

    let executable = ExecutableResolver::new()
        .resolve(args.ffmpeg.as_deref())
        .await
        .map_err(|e| (Stage::ResolvingExecutable, e))?;
    formatter.debug(&format!("FFmpeg path: {}", executable.path().display()));
    if verbosity_is_debug(args) {
        let version = probe_version(&executable).await;
        formatter.debug(&format!(
            "Using ffmpeg version: {}",
            version.as_deref().unwrap_or("unknown")
        ));
    }

    let destination = request.destination.display().to_string();
    if !request.dry_run {
        formatter.print_download_start(&request.source_url, &destination);
    }

    let progress_formatter = formatter.clone();
    let invoker = DownloadInvoker::new()
        .with_progress(move |progress| progress_formatter.update_progress(&progress));
    let outcome = invoker.invoke(&executable, request.clone()).await;
    formatter.finish_progress();

    match outcome.status {
        OutcomeStatus::DryRun => {
            formatter.print_dry_run(outcome.diagnostic.as_deref().unwrap_or_default());
            return Ok(());
        }
        OutcomeStatus::Completed => {
            info!("Download completed successfully");
            formatter.print_download_complete(&destination, start_time.elapsed());
            return Ok(());
        }
        OutcomeStatus::NonzeroExit | OutcomeStatus::Interrupted
            if args.keep_partial && request.destination.exists() =>
        {
            formatter.warning(&format!("Partial output kept at {}", destination));
        }
        _ => {}
    }

    match outcome.into_error(executable.path(), &request.destination) {
        Some(e) => Err((Stage::Invoking, e)),
        None => Ok(()),
    }
}

fn verbosity_is_debug(args: &Args) -> bool {
    args.verbosity_level() == Verbosity::Debug
}

/// Initialize logging system
fn init_logging(verbosity: Verbosity) -> anyhow::Result<()> {
    // RUST_LOG wins; otherwise derive the filter from the CLI verbosity
    let level = verbosity.log_filter();
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("warn,bt_recover={level},ffmpeg={level}"))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity == Verbosity::Debug)
                .without_time()
                .compact(),
        )
        .try_init()
        .context("failed to initialize logging")?;

    Ok(())
}
