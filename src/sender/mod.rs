pub mod client;
pub mod factory;
pub mod http;
pub mod null;
pub mod serialization;
pub mod stats;

pub use client::ReqwestTransport;
pub use factory::{DefaultTransportFactory, TransportFactory};
pub use http::HyperTransport;
pub use null::NullTransport;
pub use serialization::{Envelope, FORM_FIELD, SerializationError, form_body};
pub use stats::{StatsSnapshot, TransmissionStats};

use std::time::Duration;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("HTTP error: status {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("No transport backend named '{0}'")]
    Unconfigured(String),
    #[error("Transport runtime error: {0}")]
    Runtime(String),
}

/// Which HTTP status codes count as a successful POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuccessPolicy {
    /// Exactly `200 OK`. Matches what existing aggregation servers expect.
    #[default]
    ExactOk,
    /// Any `2xx`.
    Any2xx,
}

impl SuccessPolicy {
    pub fn accepts(&self, status: u16) -> bool {
        match self {
            SuccessPolicy::ExactOk => status == 200,
            SuccessPolicy::Any2xx => (200..300).contains(&status),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub ignore_tls_peer_verification: bool,
    pub no_proxy: bool,
    pub success_policy: SuccessPolicy,
    /// `None` leaves requests unbounded; a hung peer hangs the worker.
    pub request_timeout: Option<Duration>,
    /// Pause after every response is read.
    pub throttle: Duration,
    pub user_agent: String,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            ignore_tls_peer_verification: false,
            no_proxy: false,
            success_policy: SuccessPolicy::default(),
            request_timeout: None,
            throttle: Duration::from_millis(100),
            user_agent: format!("status-updater/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// GET/POST capability the worker talks to.
///
/// Implementations are owned by exactly one worker thread, hence `Send` but
/// not `Sync`, and `&mut self` so backends may rebuild their client when a
/// toggle changes.
#[cfg_attr(test, automock)]
pub trait Transport: Send {
    /// Returns the response body.
    fn get(&mut self, url: &str, user: &str, pass: &str) -> Result<String, TransportError>;

    /// Sends `body` as `application/x-www-form-urlencoded`.
    fn post(&mut self, url: &str, body: &str, user: &str, pass: &str)
    -> Result<(), TransportError>;

    fn set_ignore_tls_peer_verification(&mut self, ignore: bool);

    fn set_no_proxy(&mut self, no_proxy: bool);

    fn name(&self) -> &'static str;
}

impl std::fmt::Debug for dyn Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").field("name", &self.name()).finish()
    }
}
