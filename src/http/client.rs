//! HTTP client for the remote API
//!
//! Handles:
//! - API key authentication
//! - Optional request pacing
//! - Query parameters and JSON bodies
//!
//! Responses come back unvalidated as `ApiResponse`; see `validate` for the
//! mapping to payloads and typed failures.

use super::pacing::{Pacer, PacingConfig};
use super::validate::process_response;
use crate::auth::ApiToken;
use crate::config::HttpSettings;
use crate::error::Result;
use crate::types::{JsonValue, QueryParams};
use bytes::Bytes;
use reqwest::{Client, Method};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout
    pub timeout: Duration,
    /// Request quota, if paced
    pub pacing: Option<PacingConfig>,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        let mut default_headers = HashMap::new();
        default_headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            timeout: Duration::from_secs(60),
            pacing: None,
            default_headers,
            user_agent: format!("casesync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }

    /// Build a config from operator settings
    pub fn from_settings(settings: &HttpSettings) -> Self {
        let mut builder = Self::builder().timeout(Duration::from_secs(settings.timeout_seconds));
        if let Some(rps) = settings.requests_per_second {
            builder = builder.pacing(PacingConfig::per_second(rps));
        } else if let Some(rpm) = settings.requests_per_minute {
            builder = builder.pacing(PacingConfig::per_minute(rpm));
        }
        if let Some(agent) = &settings.user_agent {
            builder = builder.user_agent(agent);
        }
        builder.build()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Pace requests to a quota
    pub fn pacing(mut self, config: PacingConfig) -> Self {
        self.config.pacing = Some(config);
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Configuration for a single request
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Query parameters
    pub query: QueryParams,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body (JSON)
    pub body: Option<JsonValue>,
}

impl RequestConfig {
    /// Create a new request config
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given query parameters
    #[must_use]
    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }
}

/// A raw, unvalidated response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Canonical reason phrase for the status
    pub reason: String,
    /// Response body
    pub body: Bytes,
}

impl ApiResponse {
    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client for the remote API
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    token: Option<ApiToken>,
    pacer: Option<Pacer>,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let pacer = config.pacing.map(Pacer::new);

        Ok(Self {
            client,
            config,
            token: None,
            pacer,
        })
    }

    /// Attach the API token used for every request
    #[must_use]
    pub fn with_token(mut self, token: ApiToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Clone the transport with a different token
    ///
    /// The underlying connection pool and limiter are shared.
    pub fn for_token(&self, token: ApiToken) -> Self {
        Self {
            client: self.client.clone(),
            config: self.config.clone(),
            token: Some(token),
            pacer: self.pacer.clone(),
        }
    }

    /// Make a GET request
    pub async fn get(&self, url: &str, config: RequestConfig) -> Result<ApiResponse> {
        self.request(Method::GET, url, config).await
    }

    /// Make a generic request
    ///
    /// Only transport failures are errors here; any status code is returned.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        config: RequestConfig,
    ) -> Result<ApiResponse> {
        if let Some(ref pacer) = self.pacer {
            pacer.ready().await;
        }

        let mut req = self.client.request(method.clone(), url);

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }

        for (key, value) in &config.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if !config.query.is_empty() {
            req = req.query(&config.query);
        }

        if let Some(ref body) = config.body {
            req = req.json(body);
        }

        if let Some(ref token) = self.token {
            req = token.apply(req);
        }

        let response = req.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        debug!(%method, url, status = status.as_u16(), bytes = body.len(), "Request completed");

        Ok(ApiResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }

    /// Make a request and validate the response into JSON
    pub async fn request_json(
        &self,
        method: Method,
        url: &str,
        config: RequestConfig,
    ) -> Result<JsonValue> {
        let response = self.request(method, url, config).await?;
        process_response(&response)
    }

    /// Make a GET request and validate the response into JSON
    pub async fn get_json(&self, url: &str, config: RequestConfig) -> Result<JsonValue> {
        self.request_json(Method::GET, url, config).await
    }

    /// Check if rate limiting is enabled
    pub fn is_paced(&self) -> bool {
        self.pacer.is_some()
    }

    /// Check if a token is attached
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("has_token", &self.token.is_some())
            .field("pacer", &self.pacer)
            .finish_non_exhaustive()
    }
}
