use super::{Transport, TransportError, TransportSettings};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use hyper::{Method, Request, Uri};
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use std::thread;
use tokio::runtime::{Builder, Runtime};
use tokio::time::timeout;
use tracing::debug;

/// Plain-HTTP backend on hyper, driven by a private current-thread runtime
/// that lives on the worker thread.
///
/// There is no TLS and no proxy support: `https` URLs are rejected and the
/// two toggles are recorded but have no effect.
pub struct HyperTransport {
    settings: TransportSettings,
    runtime: Option<Runtime>,
    client: Client<HttpConnector, Full<Bytes>>,
}

impl HyperTransport {
    pub fn new(settings: TransportSettings) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(HttpConnector::new());

        Self {
            settings,
            runtime: None,
            client,
        }
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    fn runtime(&mut self) -> Result<&Runtime, TransportError> {
        if self.runtime.is_none() {
            let runtime = Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| TransportError::Runtime(e.to_string()))?;
            self.runtime = Some(runtime);
        }

        self.runtime
            .as_ref()
            .ok_or_else(|| TransportError::Runtime("runtime unavailable".to_string()))
    }

    fn parse_uri(url: &str) -> Result<Uri, TransportError> {
        let uri = url
            .parse::<Uri>()
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", url, e)))?;

        match uri.scheme_str() {
            Some("http") => Ok(uri),
            Some(other) => Err(TransportError::UnsupportedScheme(format!(
                "{} (the hyper backend only speaks plain http)",
                other
            ))),
            None => Err(TransportError::InvalidUrl(format!("{}: missing scheme", url))),
        }
    }

    fn request(
        &mut self,
        method: Method,
        url: &str,
        body: Option<&str>,
        user: &str,
        pass: &str,
    ) -> Result<String, TransportError> {
        let uri = Self::parse_uri(url)?;
        let credentials = STANDARD.encode(format!("{}:{}", user, pass));

        let mut builder = Request::builder()
            .method(method.clone())
            .uri(uri)
            .header(AUTHORIZATION, format!("Basic {}", credentials))
            .header(USER_AGENT, self.settings.user_agent.as_str());
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        }

        let payload = body.map(|b| Bytes::from(b.to_owned())).unwrap_or_default();
        let request = builder
            .body(Full::new(payload))
            .map_err(|e| TransportError::Request(format!("Failed to build request: {}", e)))?;

        let client = self.client.clone();
        let request_timeout = self.settings.request_timeout;

        let (status, text) = self.runtime()?.block_on(async move {
            let send = client.request(request);
            let response = match request_timeout {
                Some(limit) => timeout(limit, send).await.map_err(|_| {
                    TransportError::Connection(format!("request timed out after {:?}", limit))
                })?,
                None => send.await,
            }
            .map_err(|e| TransportError::Connection(e.to_string()))?;

            let status = response.status().as_u16();
            let bytes = response
                .into_body()
                .collect()
                .await
                .map_err(|e| TransportError::Request(e.to_string()))?
                .to_bytes();

            Ok::<_, TransportError>((status, String::from_utf8_lossy(&bytes).into_owned()))
        })?;

        debug!(%method, url, status, "hyper request completed");
        thread::sleep(self.settings.throttle);

        if self.settings.success_policy.accepts(status) {
            Ok(text)
        } else {
            Err(TransportError::Http { status, body: text })
        }
    }
}

impl Transport for HyperTransport {
    fn get(&mut self, url: &str, user: &str, pass: &str) -> Result<String, TransportError> {
        self.request(Method::GET, url, None, user, pass)
    }

    fn post(
        &mut self,
        url: &str,
        body: &str,
        user: &str,
        pass: &str,
    ) -> Result<(), TransportError> {
        self.request(Method::POST, url, Some(body), user, pass)
            .map(|_| ())
    }

    fn set_ignore_tls_peer_verification(&mut self, ignore: bool) {
        debug!(ignore, "hyper backend has no TLS; toggle recorded only");
        self.settings.ignore_tls_peer_verification = ignore;
    }

    fn set_no_proxy(&mut self, no_proxy: bool) {
        debug!(no_proxy, "hyper backend never uses a proxy; toggle recorded only");
        self.settings.no_proxy = no_proxy;
    }

    fn name(&self) -> &'static str {
        "hyper"
    }
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("settings", &self.settings)
            .field("runtime_started", &self.runtime.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_is_rejected() {
        let mut transport = HyperTransport::new(TransportSettings::default());
        let result = transport.post("https://example.com/updates", "post=x", "u", "p");
        assert!(matches!(result, Err(TransportError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_missing_scheme_is_invalid() {
        assert!(matches!(
            HyperTransport::parse_uri("/relative/path"),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_toggles_are_recorded() {
        let mut transport = HyperTransport::new(TransportSettings::default());
        transport.set_ignore_tls_peer_verification(true);
        transport.set_no_proxy(true);
        assert!(transport.settings().ignore_tls_peer_verification);
        assert!(transport.settings().no_proxy);
    }
}
