//! AWS Parameters and Secrets Lambda extension client
//!
//! The extension serves SSM parameters over a local HTTP port, so reads do
//! not need the AWS SDK. Writes are not offered by the extension.

use super::store::ParameterStore;
use crate::error::{Error, Result};
use crate::http::validate::check_store_status;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Header the extension authenticates callers with
const TOKEN_HEADER: &str = "X-Aws-Parameters-Secrets-Token";

/// Configuration for the extension client
#[derive(Debug, Clone)]
pub struct ExtensionParameterStoreConfig {
    /// Base URL of the extension's parameter endpoint
    pub base_url: String,
    /// Session token forwarded to the extension
    pub session_token: Option<String>,
    /// Decrypt SecureString parameters
    pub with_decryption: bool,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for ExtensionParameterStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:2773/systemsmanager/parameters".to_string(),
            session_token: None,
            with_decryption: true,
            timeout: Duration::from_secs(5),
        }
    }
}

impl ExtensionParameterStoreConfig {
    /// Default config with the session token taken from `AWS_SESSION_TOKEN`
    pub fn from_env() -> Self {
        Self {
            session_token: std::env::var("AWS_SESSION_TOKEN").ok(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct GetParameterResponse {
    #[serde(rename = "Parameter")]
    parameter: ParameterValue,
}

#[derive(Debug, Deserialize)]
struct ParameterValue {
    #[serde(rename = "Value")]
    value: String,
}

/// Parameter store backed by the Lambda extension
#[derive(Debug, Clone)]
pub struct ExtensionParameterStore {
    client: Client,
    config: ExtensionParameterStoreConfig,
}

impl ExtensionParameterStore {
    /// Create a client for the given config
    pub fn new(config: ExtensionParameterStoreConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn get_url(&self) -> String {
        format!("{}/get", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ParameterStore for ExtensionParameterStore {
    async fn get(&self, name: &str) -> Result<String> {
        let mut req = self.client.get(self.get_url()).query(&[
            ("name", name),
            (
                "withDecryption",
                if self.config.with_decryption {
                    "true"
                } else {
                    "false"
                },
            ),
        ]);
        if let Some(token) = &self.config.session_token {
            req = req.header(TOKEN_HEADER, token);
        }

        let response = req
            .send()
            .await
            .map_err(|e| Error::parameter_store(name, e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::parameter_store(name, e.to_string()))?;
        check_store_status(name, status, &body)?;

        let parsed: GetParameterResponse = serde_json::from_str(&body)
            .map_err(|e| Error::parameter_store(name, format!("Unexpected response: {e}")))?;
        debug!(name, "Loaded parameter");
        Ok(parsed.parameter.value)
    }

    async fn put(&self, name: &str, _value: &str, _overwrite: bool) -> Result<()> {
        Err(Error::parameter_store(
            name,
            "the Lambda extension is read-only",
        ))
    }
}
