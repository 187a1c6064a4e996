//! Error types for casesync
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Errors fall into two classes that drive run control:
//! - recoverable: a single API call failed; counted against the run's error budget
//! - fatal: storage, budget and decoding failures; abort the whole run

use thiserror::Error;

/// The main error type for casesync
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Remote API Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request failed! Code: {status}. Reason: {reason}")]
    Api { status: u16, reason: String },

    #[error("Request budget of {budget} exhausted for domain '{domain}'")]
    RequestBudgetExhausted { domain: String, budget: u32 },

    #[error("Aborting run after {failures} API failures: {source}")]
    ErrorBudgetExhausted {
        failures: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Pagination Errors
    // ============================================================================
    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("Pagination error for '{data_type}': {message}")]
    Pagination { data_type: String, message: String },

    #[error("Invalid timestamp '{value}'")]
    Timestamp { value: String },

    #[error("Cannot derive a page limit from an empty response")]
    EmptyObservation,

    // ============================================================================
    // Storage Errors
    // ============================================================================
    #[error("Object not found: {key}")]
    NotFound { key: String },

    #[error("Storage error for '{key}': {message}")]
    Storage { key: String, message: String },

    #[error("Parameter not found: {name}")]
    ParameterNotFound { name: String },

    #[error("Parameter store request failed for '{name}': {message}")]
    ParameterStore { name: String, message: String },

    // ============================================================================
    // State Errors
    // ============================================================================
    #[error("State error: {message}")]
    State { message: String },

    #[error("No last successful job time stored for '{data_type}' and no date range given")]
    MissingRunState { data_type: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an API status error
    pub fn api(status: u16, reason: impl Into<String>) -> Self {
        Self::Api {
            status,
            reason: reason.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a pagination error
    pub fn pagination(data_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pagination {
            data_type: data_type.into(),
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a parameter store error
    pub fn parameter_store(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParameterStore {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Whether this failure only costs the current unit of work.
    ///
    /// Recoverable errors are counted against the run's error budget;
    /// everything else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Api { .. } | Error::Http(_))
    }

    /// Whether this error means "no resumption state yet" rather than a failure
    pub fn is_missing_state(&self) -> bool {
        matches!(self, Error::MissingRunState { .. })
    }

    /// Whether this error is a missing key in the object or parameter store
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. } | Error::ParameterNotFound { .. })
    }

    /// HTTP status carried by an API failure
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias for casesync
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
