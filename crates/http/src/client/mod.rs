//! Shopfront HTTP client
//!
//! Every call goes through one pipeline: attach the bearer token unless the
//! target is an auth endpoint, send, and on a 401 from a non-auth endpoint
//! obtain a fresh token from the [`RefreshCoordinator`] and replay the
//! request exactly once.

pub mod analytics;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod delivery;
pub mod discounts;
pub mod error;
pub mod events;
pub mod orders;
pub mod refresh;
pub mod users;

pub use config::AuthEndpoints;
pub use error::{ClientError, RefreshError};
pub use events::SessionEvent;
pub use refresh::{HttpTokenRefresher, RefreshCoordinator, TokenRefresher};

use error::extract_message;
use reqwest::header::{self, HeaderValue};
use reqwest::{Client, ClientBuilder, Request, Response, StatusCode};
use shopfront_core::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

/// Shopfront API client
///
/// Cheap to clone; clones share the session, cookie jar and refresh task.
#[derive(Clone)]
pub struct ShopClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: Client,
    base_url: String,
    /// Parsed form of `base_url`, used to append encoded path segments
    base: url::Url,
    timeout: Option<Duration>,
    endpoints: AuthEndpoints,
    /// URL paths of the auth endpoints, as they appear on outgoing requests
    auth_paths: Vec<String>,
    session: SessionStore,
    refresh: RefreshCoordinator,
    events: broadcast::Sender<SessionEvent>,
}

impl ShopClient {
    /// Create a new client with default configuration and an in-memory session
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> ShopClientBuilder {
        ShopClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Per-request timeout, `None` when requests may take as long as they need
    pub fn timeout(&self) -> Option<Duration> {
        self.inner.timeout
    }

    pub fn endpoints(&self) -> &AuthEndpoints {
        &self.inner.endpoints
    }

    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// Receive session lifecycle events from this point on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn notify(&self, event: SessionEvent) {
        let _ = self.inner.events.send(event);
    }

    /// Create a request builder for `path` relative to the base URL
    ///
    /// Authentication is added when the request is sent.
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.inner.base_url, path);
        self.inner.http.request(method, url)
    }

    /// Create a request builder for the resource named by `segments`
    ///
    /// Each segment is percent-encoded, so ids containing `/` or `?` stay
    /// within their own path segment.
    pub fn request_at(
        &self,
        method: reqwest::Method,
        segments: &[&str],
    ) -> reqwest::RequestBuilder {
        let mut url = self.inner.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        self.inner.http.request(method, url)
    }

    fn is_auth_endpoint(&self, request: &Request) -> bool {
        let path = request.url().path();
        self.inner.auth_paths.iter().any(|p| p == path)
    }

    /// Send a request through the authentication pipeline
    ///
    /// Error statuses are returned as responses; only transport failures and
    /// failed refreshes are errors here.
    pub async fn send(&self, mut request: Request) -> Result<Response, ClientError> {
        let exempt = self.is_auth_endpoint(&request);
        let sent_with = if exempt {
            None
        } else {
            self.inner.session.access_token()
        };
        if let Some(token) = &sent_with {
            attach_bearer(&mut request, token)?;
        }
        // Bodies that cannot be cloned cannot be replayed
        let replay = if exempt { None } else { request.try_clone() };

        debug!(method = %request.method(), url = %request.url(), "Sending request");
        let response = self.inner.http.execute(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        let Some(mut replay) = replay else {
            return Ok(response);
        };

        debug!(url = %replay.url(), "Request unauthorized, waiting for a fresh token");
        let token = self.inner.refresh.fresh_token(sent_with).await?;
        attach_bearer(&mut replay, &token)?;

        debug!(method = %replay.method(), url = %replay.url(), "Replaying request");
        Ok(self.inner.http.execute(replay).await?)
    }

    /// Execute a request and decode its JSON body
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self.send(request.build()?).await?;
        let body = checked_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Execute a request whose response body is ignored
    pub async fn execute_empty(&self, request: reqwest::RequestBuilder) -> Result<(), ClientError> {
        let response = self.send(request.build()?).await?;
        checked_body(response).await.map(|_| ())
    }
}

async fn checked_body(response: Response) -> Result<String, ClientError> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(ClientError::from_status(status, extract_message(&body, status)))
    }
}

fn attach_bearer(request: &mut Request, token: &str) -> Result<(), ClientError> {
    let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
        ClientError::Configuration("access token is not a valid header value".into())
    })?;
    request.headers_mut().insert(header::AUTHORIZATION, value);
    Ok(())
}

/// Builder for ShopClient
#[derive(Default)]
pub struct ShopClientBuilder {
    base_url: Option<String>,
    /// `Some(None)` disables the timeout; `None` keeps the default
    timeout: Option<Option<Duration>>,
    user_agent: Option<String>,
    session: Option<SessionStore>,
    endpoints: Option<AuthEndpoints>,
    refresher: Option<Arc<dyn TokenRefresher>>,
}

impl ShopClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(Some(timeout));
        self
    }

    /// Let requests run without a timeout
    pub fn no_timeout(mut self) -> Self {
        self.timeout = Some(None);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Use an existing session store instead of a fresh in-memory one
    pub fn session(mut self, session: SessionStore) -> Self {
        self.session = Some(session);
        self
    }

    /// Override the login, refresh and logout paths
    pub fn endpoints(mut self, endpoints: AuthEndpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Replace the HTTP refresh call, mainly for tests
    pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Build the client
    ///
    /// Must be called from within a tokio runtime, which hosts the refresh task.
    pub fn build(self) -> Result<ShopClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();
        let base = url::Url::parse(&base_url)
            .map_err(|e| ClientError::Configuration(format!("invalid base_url {base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::Configuration(format!(
                "base_url {base_url} cannot hold resource paths"
            )));
        }

        if tokio::runtime::Handle::try_current().is_err() {
            return Err(ClientError::Configuration(
                "client must be built inside a tokio runtime".into(),
            ));
        }

        let timeout = self.timeout.unwrap_or(Some(config::DEFAULT_TIMEOUT));
        let mut http = ClientBuilder::new().cookie_store(true).user_agent(
            self.user_agent
                .unwrap_or_else(|| config::DEFAULT_USER_AGENT.to_string()),
        );
        if let Some(timeout) = timeout {
            http = http.timeout(timeout);
        }
        let http = http.build()?;

        let endpoints = self.endpoints.unwrap_or_default();
        let auth_paths = endpoints
            .paths()
            .iter()
            .map(|p| url_path(&format!("{base_url}{p}")))
            .collect::<Result<Vec<_>, _>>()?;

        let session = self.session.unwrap_or_else(SessionStore::in_memory);
        let refresher = self.refresher.unwrap_or_else(|| {
            Arc::new(HttpTokenRefresher::new(
                http.clone(),
                format!("{base_url}{}", endpoints.refresh),
            ))
        });
        let (events, _) = broadcast::channel(16);
        let refresh = RefreshCoordinator::spawn(refresher, session.clone(), events.clone());

        Ok(ShopClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                base,
                timeout,
                endpoints,
                auth_paths,
                session,
                refresh,
                events,
            }),
        })
    }
}

fn url_path(url: &str) -> Result<String, ClientError> {
    url::Url::parse(url)
        .map(|u| u.path().to_string())
        .map_err(|e| ClientError::Configuration(format!("invalid endpoint url {url}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_builder_trims_trailing_slash() {
        let client = ShopClient::new("http://localhost:5000/api/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000/api");
        assert_eq!(
            client.inner.auth_paths,
            ["/api/auth/login", "/api/auth/refresh", "/api/auth/logout"]
        );
    }

    #[tokio::test]
    async fn test_timeout_default_override_and_disable() {
        let default = ShopClient::new("http://localhost:5000/api").unwrap();
        assert_eq!(default.timeout(), Some(config::DEFAULT_TIMEOUT));

        let custom = ShopClient::builder()
            .base_url("http://localhost:5000/api")
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(custom.timeout(), Some(Duration::from_secs(5)));

        let unbounded = ShopClient::builder()
            .base_url("http://localhost:5000/api")
            .timeout(Duration::from_secs(5))
            .no_timeout()
            .build()
            .unwrap();
        assert_eq!(unbounded.timeout(), None);
    }

    #[tokio::test]
    async fn test_request_at_encodes_segments() {
        let client = ShopClient::new("http://localhost:5000/api/").unwrap();
        let request = client
            .request_at(reqwest::Method::GET, &["products", "a/b?c d"])
            .build()
            .unwrap();
        assert_eq!(request.url().path(), "/api/products/a%2Fb%3Fc%20d");
        assert_eq!(request.url().query(), None);

        let root = ShopClient::new("http://localhost:5000").unwrap();
        let request = root
            .request_at(reqwest::Method::PATCH, &["orders", "o-1", "status"])
            .build()
            .unwrap();
        assert_eq!(request.url().as_str(), "http://localhost:5000/orders/o-1/status");
    }

    #[tokio::test]
    async fn test_builder_rejects_invalid_base_url() {
        let result = ShopClient::builder().base_url("not a url").build();
        assert!(matches!(result, Err(ClientError::Configuration(_))));
    }

    #[test]
    fn test_builder_requires_runtime() {
        let result = ShopClient::new("http://localhost:5000");
        assert!(matches!(result, Err(ClientError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_auth_endpoints_are_exempt() {
        let client = ShopClient::new("http://localhost:5000/api").unwrap();
        let login = client
            .request(reqwest::Method::POST, "/auth/login")
            .build()
            .unwrap();
        let products = client
            .request(reqwest::Method::GET, "/products")
            .build()
            .unwrap();
        assert!(client.is_auth_endpoint(&login));
        assert!(!client.is_auth_endpoint(&products));
    }
}
