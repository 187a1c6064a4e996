//! API key authentication
//!
//! The remote API authenticates with `Authorization: ApiKey <token>`.
//! Tokens are looked up per domain (and optionally per specifier) in the
//! parameter store.

use crate::error::Result;
use crate::params::ParameterStore;
use reqwest::RequestBuilder;
use tracing::debug;

/// Header carrying the credential
pub const AUTH_HEADER: &str = "Authorization";

/// Scheme prefix for the header value
pub const AUTH_PREFIX: &str = "ApiKey ";

/// API token for one domain
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    /// Wrap a raw token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Header value including the scheme
    pub fn header_value(&self) -> String {
        format!("{AUTH_PREFIX}{}", self.0)
    }

    /// Apply the credential to a request
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        req.header(AUTH_HEADER, self.header_value())
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

/// Parameter name holding the token for a domain
///
/// `{domain}-api-key`, or `{domain}-{specifier}-api-key` for push sources
/// that carry their own credential.
pub fn token_param_name(domain: &str, specifier: Option<&str>) -> String {
    match specifier {
        Some(spec) => format!("{domain}-{spec}-api-key"),
        None => format!("{domain}-api-key"),
    }
}

/// Fetch the token for a domain from the parameter store
pub async fn fetch_api_token(
    store: &dyn ParameterStore,
    domain: &str,
    specifier: Option<&str>,
) -> Result<ApiToken> {
    let name = token_param_name(domain, specifier);
    let value = store.get(&name).await?;
    debug!(domain, specifier, "Got API token");
    Ok(ApiToken::new(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::params::InMemoryParameterStore;

    #[test]
    fn test_token_param_name() {
        assert_eq!(token_param_name("demo", None), "demo-api-key");
        assert_eq!(
            token_param_name("demo", Some("clinic-a")),
            "demo-clinic-a-api-key"
        );
    }

    #[test]
    fn test_token_header_and_debug() {
        let token = ApiToken::new("user:secret");
        assert_eq!(token.header_value(), "ApiKey user:secret");
        assert_eq!(format!("{token:?}"), "ApiToken(***)");
    }

    #[tokio::test]
    async fn test_fetch_api_token() {
        let store = InMemoryParameterStore::from_pairs([
            ("demo-api-key", "t1"),
            ("demo-clinic-api-key", "t2"),
        ]);

        let token = fetch_api_token(&store, "demo", None).await.unwrap();
        assert_eq!(token, ApiToken::new("t1"));

        let token = fetch_api_token(&store, "demo", Some("clinic")).await.unwrap();
        assert_eq!(token, ApiToken::new("t2"));

        let err = fetch_api_token(&store, "other", None).await.unwrap_err();
        assert!(matches!(err, Error::ParameterNotFound { name } if name == "other-api-key"));
    }
}
