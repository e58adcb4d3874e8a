use super::{HyperTransport, NullTransport, ReqwestTransport, Transport, TransportSettings};
use tracing::{debug, warn};

/// Backend used when the configuration names none.
pub const DEFAULT_NETWORKING_TOOL: &str = "reqwest";

/// Maps a `networkingTool` name to a transport instance.
///
/// Must never fail: unknown names produce a [`NullTransport`].
pub trait TransportFactory: Send + Sync {
    fn create(&self, name: Option<&str>, settings: &TransportSettings) -> Box<dyn Transport>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTransportFactory;

impl DefaultTransportFactory {
    pub fn new() -> Self {
        Self
    }

    pub fn known_backends() -> &'static [&'static str] {
        &["reqwest", "curl", "hyper", "socket"]
    }
}

impl TransportFactory for DefaultTransportFactory {
    fn create(&self, name: Option<&str>, settings: &TransportSettings) -> Box<dyn Transport> {
        let requested = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_NETWORKING_TOOL);

        let transport: Box<dyn Transport> = match requested.to_ascii_lowercase().as_str() {
            "reqwest" | "curl" => Box::new(ReqwestTransport::new(settings.clone())),
            "hyper" | "socket" => Box::new(HyperTransport::new(settings.clone())),
            _ => {
                warn!(
                    networking_tool = requested,
                    known = ?Self::known_backends(),
                    "Unknown networking tool, status updates will not be sent"
                );
                Box::new(NullTransport::new(requested))
            }
        };

        debug!(
            networking_tool = requested,
            backend = transport.name(),
            "Resolved transport backend"
        );
        transport
    }
}
