use exabridge_core::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

pub mod format;
pub mod poller;
pub mod research;
pub mod search;

pub const DEFAULT_BASE_URL: &str = "https://api.exa.ai";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const API_KEY_HEADER: &str = "x-api-key";
const INTEGRATION_HEADER: &str = "x-exa-integration";
const INTEGRATION_NAME: &str = "exabridge";
/// Cap on how much of a provider error body we carry into error messages.
const ERROR_BODY_MAX_CHARS: usize = 500;

#[derive(Clone)]
pub struct ExaConfig {
    api_key: String,
    base_url: Url,
    request_timeout: Duration,
}

impl ExaConfig {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::NotConfigured("empty Exa API key".to_string()));
        }
        Ok(Self {
            api_key: api_key.trim().to_string(),
            base_url: Url::parse(DEFAULT_BASE_URL)
                .map_err(|e| Error::InvalidParams(e.to_string()))?,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_base_url(mut self, raw: &str) -> Result<Self> {
        let url = Url::parse(raw.trim())
            .map_err(|e| Error::InvalidParams(format!("invalid base url {raw:?}: {e}")))?;
        if url.cannot_be_a_base() {
            return Err(Error::InvalidParams(format!(
                "base url {raw:?} cannot carry a path"
            )));
        }
        self.base_url = url;
        Ok(self)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

impl fmt::Debug for ExaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExaConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Authenticated client for the provider's HTTP API. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ExaClient {
    http: reqwest::Client,
    config: Arc<ExaConfig>,
}

impl ExaClient {
    pub fn new(http: reqwest::Client, config: ExaConfig) -> Self {
        Self {
            http,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ExaConfig {
        &self.config
    }

    /// Appends path segments to the base URL. Segments are percent-encoded individually, so
    /// an opaque id can never escape its segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidParams("base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) async fn post_json<B, T>(
        &self,
        op: &'static str,
        segments: &[&str],
        body: &B,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        let rb = self.http.post(url).json(body);
        self.send(op, rb).await
    }

    pub(crate) async fn get_json<T>(&self, op: &'static str, segments: &[&str]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        let rb = self.http.get(url);
        self.send(op, rb).await
    }

    async fn send<T>(&self, op: &'static str, rb: reqwest::RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let t0 = Instant::now();
        let resp = rb
            .header(API_KEY_HEADER, self.config.api_key.as_str())
            .header(INTEGRATION_HEADER, INTEGRATION_NAME)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(op, error = %e, "provider request failed");
                Error::Transport(e.to_string())
            })?;

        let status = resp.status();
        tracing::debug!(
            op,
            status = status.as_u16(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "provider response"
        );
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(op, status = status.as_u16(), "provider returned an error status");
            return Err(Error::Http {
                status: status.as_u16(),
                message: error_message_from_body(&body, status),
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| Error::Decode(format!("{op}: {e}")))
    }
}

/// Prefer the provider's own `error`/`message` field; fall back to a bounded body excerpt.
fn error_message_from_body(body: &str, status: reqwest::StatusCode) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "message"] {
            if let Some(s) = v.get(key).and_then(|x| x.as_str()) {
                if !s.trim().is_empty() {
                    return s.trim().to_string();
                }
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
    }
    trimmed.chars().take(ERROR_BODY_MAX_CHARS).collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use axum::Router;
    use std::net::SocketAddr;

    pub(crate) async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    pub(crate) fn client_for(addr: SocketAddr) -> super::ExaClient {
        let config = super::ExaConfig::new("test-key")
            .unwrap()
            .with_base_url(&format!("http://{addr}"))
            .unwrap();
        super::ExaClient::new(reqwest::Client::new(), config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};

    #[test]
    fn debug_output_never_contains_the_key() {
        let cfg = ExaConfig::new("super-secret").unwrap();
        let s = format!("{cfg:?}");
        assert!(!s.contains("super-secret"));
        assert!(s.contains("<redacted>"));
    }

    #[test]
    fn endpoint_keeps_base_path_and_encodes_segments() {
        let cfg = ExaConfig::new("k")
            .unwrap()
            .with_base_url("http://proxy.local/exa/")
            .unwrap();
        let c = ExaClient::new(reqwest::Client::new(), cfg);
        let u = c.endpoint(&["research", "v0", "tasks", "a/b c"]).unwrap();
        assert_eq!(
            u.as_str(),
            "http://proxy.local/exa/research/v0/tasks/a%2Fb%20c"
        );
    }

    #[test]
    fn error_body_prefers_provider_message() {
        let msg = error_message_from_body(
            r#"{"error":"Invalid API key"}"#,
            reqwest::StatusCode::UNAUTHORIZED,
        );
        assert_eq!(msg, "Invalid API key");
        let msg = error_message_from_body("", reqwest::StatusCode::BAD_GATEWAY);
        assert_eq!(msg, "Bad Gateway");
    }

    #[tokio::test]
    async fn sends_api_key_and_maps_non_success_to_http_error() {
        let app = Router::new().route(
            "/search",
            post(|headers: HeaderMap, _body: Json<serde_json::Value>| async move {
                if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some("test-key") {
                    return (StatusCode::UNAUTHORIZED, "no key".to_string());
                }
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    r#"{"error":"slow down"}"#.to_string(),
                )
            }),
        );
        let addr = testing::serve(app).await;
        let c = testing::client_for(addr);
        let err = c
            .post_json::<_, serde_json::Value>(
                "search",
                &["search"],
                &serde_json::json!({"query": "q"}),
            )
            .await
            .unwrap_err();
        match err {
            Error::Http { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "slow down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_provider_is_a_transport_error() {
        // Bind then drop to get a port that refuses connections.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let c = testing::client_for(addr);
        let err = c
            .get_json::<serde_json::Value>("research_status", &["research", "v0", "tasks", "t1"])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)), "{err:?}");
        assert!(err.is_transient());
    }
}
