use super::{DEFAULT_CONFIG_FILE, LogLevel};
use crate::buffer::BatchMode;
use clap::Parser;
use std::path::PathBuf;

/// Send status updates to the configured aggregation endpoint.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Properties file with url, item_id, client_key, username and password
    #[arg(long, short = 'c', default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Free-text message to post (repeatable)
    #[arg(long, short = 'm')]
    pub message: Vec<String>,

    /// Progress percentage to post
    #[arg(long)]
    pub progress: Option<f64>,

    /// Convergence percentage to post
    #[arg(long)]
    pub convergence: Option<f64>,

    /// Override the networkingTool from the properties file
    #[arg(long)]
    pub networking_tool: Option<String>,

    /// Skip TLS peer verification
    #[arg(long)]
    pub insecure: bool,

    /// Bypass any configured proxy
    #[arg(long)]
    pub no_proxy: bool,

    /// Send everything queued in one envelope instead of one event per request
    #[arg(long)]
    pub batch: bool,

    /// Directory for diagnostics files
    #[arg(long)]
    pub diagnostics_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "STATUS_UPDATER_LOG", default_value = "info")]
    pub log_level: LogLevel,
}

impl Cli {
    pub fn batch_mode(&self) -> BatchMode {
        if self.batch {
            BatchMode::Drain { max_events: 0 }
        } else {
            BatchMode::Single
        }
    }
}
