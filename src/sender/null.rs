use super::{Transport, TransportError};
use tracing::warn;

/// Stand-in returned by the factory for an unknown backend name.
///
/// Every call warns and fails, so the worker stops on its first post
/// instead of the host process crashing.
#[derive(Debug, Clone)]
pub struct NullTransport {
    requested: String,
}

impl NullTransport {
    pub fn new(requested: impl Into<String>) -> Self {
        Self {
            requested: requested.into(),
        }
    }

    pub fn requested(&self) -> &str {
        &self.requested
    }

    fn unconfigured(&self, operation: &str) -> TransportError {
        warn!(
            backend = %self.requested,
            operation,
            "No networking tool available under this name"
        );
        TransportError::Unconfigured(self.requested.clone())
    }
}

impl Transport for NullTransport {
    fn get(&mut self, _url: &str, _user: &str, _pass: &str) -> Result<String, TransportError> {
        Err(self.unconfigured("get"))
    }

    fn post(
        &mut self,
        _url: &str,
        _body: &str,
        _user: &str,
        _pass: &str,
    ) -> Result<(), TransportError> {
        Err(self.unconfigured("post"))
    }

    fn set_ignore_tls_peer_verification(&mut self, _ignore: bool) {
        warn!(backend = %self.requested, "Ignoring TLS toggle on unconfigured transport");
    }

    fn set_no_proxy(&mut self, _no_proxy: bool) {
        warn!(backend = %self.requested, "Ignoring proxy toggle on unconfigured transport");
    }

    fn name(&self) -> &'static str {
        "null"
    }
}
