use super::{Transport, TransportError, TransportSettings};
use reqwest::blocking::{Client, ClientBuilder, Response};
use reqwest::header::CONTENT_TYPE;
use std::thread;
use std::time::Instant;
use tracing::{debug, warn};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Blocking reqwest backend (rustls).
///
/// Keep-alive is disabled: every call opens and tears down its own
/// connection, and the client is rebuilt lazily after a toggle changes.
pub struct ReqwestTransport {
    settings: TransportSettings,
    client: Option<Client>,
}

impl ReqwestTransport {
    pub fn new(settings: TransportSettings) -> Self {
        Self {
            settings,
            client: None,
        }
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    fn client(&mut self) -> Result<&Client, TransportError> {
        if self.client.is_none() {
            let mut builder = ClientBuilder::new()
                .timeout(self.settings.request_timeout)
                .pool_max_idle_per_host(0)
                .user_agent(self.settings.user_agent.clone())
                .danger_accept_invalid_certs(self.settings.ignore_tls_peer_verification);

            if self.settings.no_proxy {
                builder = builder.no_proxy();
            }

            let client = builder.build().map_err(|e| {
                TransportError::Runtime(format!("Failed to build HTTP client: {}", e))
            })?;
            self.client = Some(client);
        }

        self.client
            .as_ref()
            .ok_or_else(|| TransportError::Runtime("HTTP client unavailable".to_string()))
    }

    fn finish(&self, response: Response) -> Result<String, TransportError> {
        let status = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        thread::sleep(self.settings.throttle);

        if self.settings.success_policy.accepts(status) {
            Ok(body)
        } else {
            Err(TransportError::Http { status, body })
        }
    }
}

fn map_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_builder() {
        TransportError::InvalidUrl(error.to_string())
    } else if error.is_connect() || error.is_timeout() {
        TransportError::Connection(error.to_string())
    } else {
        TransportError::Request(error.to_string())
    }
}

impl Transport for ReqwestTransport {
    fn get(&mut self, url: &str, user: &str, pass: &str) -> Result<String, TransportError> {
        let start = Instant::now();
        let response = self
            .client()?
            .get(url)
            .basic_auth(user, Some(pass))
            .send()
            .map_err(map_reqwest_error)?;

        debug!(url, status = response.status().as_u16(), elapsed = ?start.elapsed(), "GET completed");
        self.finish(response)
    }

    fn post(
        &mut self,
        url: &str,
        body: &str,
        user: &str,
        pass: &str,
    ) -> Result<(), TransportError> {
        let start = Instant::now();
        let response = self
            .client()?
            .post(url)
            .basic_auth(user, Some(pass))
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body.to_owned())
            .send()
            .map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        debug!(url, status, bytes = body.len(), elapsed = ?start.elapsed(), "POST completed");

        self.finish(response).map(|_| ()).inspect_err(|e| {
            warn!(url, "POST rejected: {}", e);
        })
    }

    fn set_ignore_tls_peer_verification(&mut self, ignore: bool) {
        if self.settings.ignore_tls_peer_verification != ignore {
            self.settings.ignore_tls_peer_verification = ignore;
            self.client = None;
        }
    }

    fn set_no_proxy(&mut self, no_proxy: bool) {
        if self.settings.no_proxy != no_proxy {
            self.settings.no_proxy = no_proxy;
            self.client = None;
        }
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("settings", &self.settings)
            .field("client_built", &self.client.is_some())
            .finish()
    }
}
