mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod ui;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use crate::ui::{ProgressDisplay, UiEvent};
use clap::Parser;
use tokio::sync::mpsc;
use tokio::task;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    if let Err(e) = run_app().await {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_app() -> Result<()> {
    let cli = Cli::parse();

    let (display, ui_sender, shutdown_sender) = ProgressDisplay::new();
    let display_handle = task::spawn(display.run());

    logging::setup_logging(
        cli.verbose,
        cli.quiet,
        cli.log_file.clone(),
        Some(ui_sender.clone()),
    )?;
    install_panic_report()?;

    info!("kinnet v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", &cli);

    let outcome = match configure_threads(cli.threads) {
        Ok(()) => dispatch(cli, ui_sender).await,
        Err(e) => Err(e),
    };
    if let Err(e) = &outcome {
        error!("{}", e);
    }

    // The display drains queued lines before it exits, so the error report
    // printed by `main` lands below the last progress line.
    if shutdown_sender.send(true).is_err() {
        warn!("Progress display exited before shutdown.");
    }
    display_handle
        .await
        .map_err(|e| CliError::Other(anyhow::anyhow!("Progress display task failed: {}", e)))?;

    outcome
}

async fn dispatch(cli: Cli, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    match cli.command {
        Commands::Explore(args) => commands::explore::run(args, ui_sender).await,
        Commands::Pes(args) => commands::pes::run(args, cli.verbose, ui_sender).await,
        Commands::Network(args) => commands::network::run(args, ui_sender).await,
    }
}

/// Panics are logged through tracing so that they reach the log file.
fn install_panic_report() -> Result<()> {
    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
    eyre_hook.install().map_err(|e| CliError::Other(e.into()))?;
    std::panic::set_hook(Box::new(move |info| {
        error!("{}", panic_hook.panic_report(info));
    }));
    Ok(())
}

/// Sizes the rayon pool used by the parallel reaction search.
fn configure_threads(threads: Option<usize>) -> Result<()> {
    let Some(threads) = threads else {
        return Ok(());
    };
    debug!(threads, "Configuring the worker pool.");
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to build the worker pool: {}", e)))
}
