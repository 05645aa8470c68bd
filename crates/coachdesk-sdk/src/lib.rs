//! Coachdesk Rust SDK
//!
//! Async client for the coachdesk REST backend used by the marketing engine.
//! Every request reads the bearer token from a [`TokenSource`] at call time;
//! nothing is retried.
//!
//! # Example
//!
//! ```rust,no_run
//! use coachdesk_sdk::{Client, StaticToken, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::new("http://localhost:3000/api", StaticToken::new("eyJhbGci..."))?;
//!
//!     let campaign = client.campaigns().get("6650f1c2a9").await?;
//!     println!("{}", campaign.name);
//!
//!     let services = client.catalog().services().await?;
//!     println!("{} services", services.len());
//!
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

pub use error::*;
pub use token::{FileTokenStore, StaticToken, TokenSource};

pub mod error;
pub mod gateway;
pub mod services;
pub mod token;

/// SDK version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// HTTP Client
// =============================================================================

/// Configuration for the coachdesk client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Coachdesk API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    base_url: Url,
    http: reqwest::Client,
    token: Arc<dyn TokenSource>,
}

impl Client {
    /// Create a client for `base_url` with the default timeout
    pub fn new(base_url: impl Into<String>, token: impl TokenSource + 'static) -> Result<Self> {
        Self::with_config(
            ClientConfig {
                base_url: base_url.into(),
                ..Default::default()
            },
            Arc::new(token),
        )
    }

    /// Create a client with custom configuration
    pub fn with_config(config: ClientConfig, token: Arc<dyn TokenSource>) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("'{}' cannot be used as a base URL", config.base_url)));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(&format!("coachdesk-rust/{}", VERSION))
                .map_err(|e| Error::Config(e.to_string()))?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner { config, base_url, http, token }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Email campaigns
    pub fn campaigns(&self) -> services::CampaignsService {
        services::CampaignsService::new(self.clone())
    }

    /// Contact segments
    pub fn segments(&self) -> services::SegmentsService {
        services::SegmentsService::new(self.clone())
    }

    /// Services, clients and leads
    pub fn catalog(&self) -> services::CatalogService {
        services::CatalogService::new(self.clone())
    }

    /// Make a GET request
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &[&str]) -> Result<T> {
        self.request(reqwest::Method::GET, path, None::<&()>).await
    }

    /// Make a POST request
    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &[&str],
        body: &B,
    ) -> Result<T> {
        self.request(reqwest::Method::POST, path, Some(body)).await
    }

    /// Make a PUT request
    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &[&str],
        body: &B,
    ) -> Result<T> {
        self.request(reqwest::Method::PUT, path, Some(body)).await
    }

    /// Make a DELETE request
    pub(crate) async fn delete(&self, path: &[&str]) -> Result<()> {
        self.request::<serde::de::IgnoredAny, ()>(reqwest::Method::DELETE, path, None)
            .await
            .map(|_| ())
    }

    fn endpoint(&self, path: &[&str]) -> Result<Url> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config("base URL cannot have path segments".into()))?
            .pop_if_empty()
            .extend(path);
        Ok(url)
    }

    async fn request<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        path: &[&str],
        body: Option<&B>,
    ) -> Result<T> {
        // read at call time so a token saved after startup is picked up
        let token = self.inner.token.token()?;
        let url = self.endpoint(path)?;

        let mut request = self
            .inner
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!(%method, %url, status = status.as_u16(), "backend request");

        let body_bytes = response.bytes().await?;

        if status.is_success() {
            return decode(status, &body_bytes);
        }

        Err(Error::from_response(status, &body_bytes))
    }
}

fn decode<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T> {
    if status == StatusCode::NO_CONTENT || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_str("null")?);
    }

    #[derive(Deserialize)]
    struct ApiResponse<T> {
        data: Option<T>,
    }

    // Try to parse with data wrapper first
    if let Ok(resp) = serde_json::from_slice::<ApiResponse<T>>(body) {
        if let Some(data) = resp.data {
            return Ok(data);
        }
    }

    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> Client {
        Client::new(base, StaticToken::new("t0k3n")).unwrap()
    }

    #[test]
    fn test_create_client() {
        let client = client("http://localhost:3000/api/");
        assert_eq!(client.config().timeout, DEFAULT_TIMEOUT);
        assert_eq!(client.inner.base_url.as_str(), "http://localhost:3000/api");
    }

    #[test]
    fn test_endpoint_escapes_segments() {
        let client = client("http://localhost:3000/api");
        let url = client.endpoint(&["segments", "a b/c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/segments/a%20b%2Fc");
    }

    #[test]
    fn test_rejects_non_base_url() {
        let result = Client::new("mailto:ops@coachdesk.io", StaticToken::new("t"));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_decode_envelope_and_bare() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Item {
            id: String,
        }
        let wrapped: Item = decode(StatusCode::OK, br#"{"data": {"id": "a"}}"#).unwrap();
        let bare: Item = decode(StatusCode::OK, br#"{"id": "b"}"#).unwrap();
        let list: Vec<Item> = decode(StatusCode::OK, br#"[{"id": "c"}]"#).unwrap();
        assert_eq!(wrapped.id, "a");
        assert_eq!(bare.id, "b");
        assert_eq!(list.len(), 1);
        let _: serde::de::IgnoredAny = decode(StatusCode::OK, b"").unwrap();
    }

    #[test]
    fn test_missing_token_fails_before_io() {
        // nothing listens on port 9; a network attempt would be an Http error
        let client = Client::new("http://127.0.0.1:9", StaticToken::new("  ")).unwrap();
        let result = tokio_test::block_on(client.campaigns().get("c1"));
        assert!(matches!(result, Err(Error::MissingCredential)));
    }
}
