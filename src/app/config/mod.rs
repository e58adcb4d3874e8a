pub mod cli;
pub mod properties;
pub mod validation;

pub use cli::Cli;
pub use properties::{
    CLIENT_KEY_LEN, KEY_CLIENT_KEY, KEY_ITEM_ID, KEY_NETWORKING_TOOL, KEY_PASSWORD, KEY_URL,
    KEY_USERNAME, PropertyMap, REQUIRED_KEYS, ValidatedConfig,
};
pub use validation::MIN_ENTRIES;

use crate::buffer::BatchMode;
use crate::sender::{DefaultTransportFactory, SuccessPolicy, TransportFactory, TransportSettings};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "updater.properties";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Configuration has {found} entries, at least {required} are required")]
    TooFewEntries { found: usize, required: usize },
    #[error("Missing required key '{0}'")]
    MissingKey(String),
    #[error("Required key '{0}' has an empty value")]
    EmptyValue(String),
    #[error("client_key must be exactly {expected} characters, got {length}")]
    ClientKeyLength { length: usize, expected: usize },
    #[error("Failed to read configuration from {source_name}: {reason}")]
    ReadFailed { source_name: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Runtime knobs of the updater that are not part of the properties file.
#[derive(Clone)]
pub struct UpdaterOptions {
    /// Pause between worker ticks.
    pub tick_interval: Duration,
    /// How long `stop()` waits for the worker to drain before signalling it.
    pub stop_grace: Duration,
    pub batch_mode: BatchMode,
    pub success_policy: SuccessPolicy,
    pub request_timeout: Option<Duration>,
    pub throttle: Duration,
    /// Where diagnostics files go; `None` is the working directory.
    pub diagnostics_dir: Option<PathBuf>,
    pub transport_factory: Arc<dyn TransportFactory>,
}

impl Default for UpdaterOptions {
    fn default() -> Self {
        let transport = TransportSettings::default();
        Self {
            tick_interval: Duration::from_millis(200),
            stop_grace: Duration::from_millis(1500),
            batch_mode: BatchMode::default(),
            success_policy: transport.success_policy,
            request_timeout: transport.request_timeout,
            throttle: transport.throttle,
            diagnostics_dir: None,
            transport_factory: Arc::new(DefaultTransportFactory::new()),
        }
    }
}

impl UpdaterOptions {
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    pub fn with_batch_mode(mut self, mode: BatchMode) -> Self {
        self.batch_mode = mode;
        self
    }

    pub fn with_success_policy(mut self, policy: SuccessPolicy) -> Self {
        self.success_policy = policy;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_diagnostics_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diagnostics_dir = Some(dir.into());
        self
    }

    pub fn with_transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.transport_factory = factory;
        self
    }

    /// Transport settings for a worker, given the facade's current toggles.
    pub fn transport_settings(&self, ignore_tls: bool, no_proxy: bool) -> TransportSettings {
        TransportSettings {
            ignore_tls_peer_verification: ignore_tls,
            no_proxy,
            success_policy: self.success_policy,
            request_timeout: self.request_timeout,
            throttle: self.throttle,
            ..TransportSettings::default()
        }
    }
}

impl std::fmt::Debug for UpdaterOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdaterOptions")
            .field("tick_interval", &self.tick_interval)
            .field("stop_grace", &self.stop_grace)
            .field("batch_mode", &self.batch_mode)
            .field("success_policy", &self.success_policy)
            .field("request_timeout", &self.request_timeout)
            .field("throttle", &self.throttle)
            .field("diagnostics_dir", &self.diagnostics_dir)
            .finish_non_exhaustive()
    }
}
