pub mod config;
pub mod logging_system;
pub mod updater;
pub mod worker;

pub use config::{Cli, ConfigError, LogLevel, PropertyMap, UpdaterOptions, ValidatedConfig};
pub use logging_system::{LoggingError, LoggingSystem, setup_logging};
pub use updater::Updater;
pub use worker::{Worker, WorkerState};

use crate::domain::UpdaterError;
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Exit code when the configuration is unusable.
pub const EXIT_INVALID_CONFIG: u8 = 1;
/// Exit code when the worker gave up after a failed post.
pub const EXIT_POST_FAILED: u8 = 2;

/// Drives one start / post / stop cycle from command-line arguments.
/// Returns whether every post succeeded.
pub fn run(cli: &Cli) -> Result<bool, UpdaterError> {
    let mut properties = PropertyMap::from_file(&cli.config)?;
    if let Some(tool) = &cli.networking_tool {
        properties.insert(config::KEY_NETWORKING_TOOL, tool.clone());
    }

    let mut options = UpdaterOptions::default().with_batch_mode(cli.batch_mode());
    if let Some(dir) = &cli.diagnostics_dir {
        options = options.with_diagnostics_dir(dir);
    }

    let updater = Updater::try_with_options(properties, options)?;
    updater.set_ignore_tls_peer_verification(cli.insecure);
    updater.set_no_proxy(cli.no_proxy);

    for message in &cli.message {
        updater.post_message(message);
    }
    if let Some(progress) = cli.progress {
        updater.update_progress(progress);
    }
    if let Some(convergence) = cli.convergence {
        updater.update_convergence(convergence);
    }

    info!(
        version = crate::VERSION,
        config = %cli.config.display(),
        queued = updater.pending_events(),
        "Starting status updater"
    );
    if !updater.start() {
        error!("Status updater refused to start");
        return Ok(false);
    }

    updater.stop();
    if !updater.join_worker(updater.options().stop_grace) {
        warn!("Worker still busy after stop; exiting anyway");
    }

    let stats = updater.stats();
    info!(
        posts_sent = stats.posts_sent,
        posts_failed = stats.posts_failed,
        events_sent = stats.events_sent,
        "Status updater finished"
    );
    Ok(stats.posts_failed == 0)
}

// Main entry point for the binary
pub fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(cli.log_level) {
        eprintln!("Warning: {}", e);
    }

    match run(&cli) {
        Ok(true) => Ok(ExitCode::SUCCESS),
        Ok(false) => Ok(ExitCode::from(EXIT_POST_FAILED)),
        Err(e) => {
            error!("{}", e);
            eprintln!("status-updater: {}", e);
            Ok(ExitCode::from(EXIT_INVALID_CONFIG))
        }
    }
}
