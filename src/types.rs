//! Common types used throughout casesync
//!
//! This module contains shared type definitions, type aliases,
//! and the timestamp conventions used on the wire and in object keys.

use crate::error::{Error, Result};
use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Query parameters, ordered so request logs are stable
pub type QueryParams = BTreeMap<String, String>;

// ============================================================================
// HTTP Types
// ============================================================================

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
            Method::PUT => reqwest::Method::PUT,
            Method::PATCH => reqwest::Method::PATCH,
            Method::DELETE => reqwest::Method::DELETE,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::PATCH => "PATCH",
            Method::DELETE => "DELETE",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Timestamps
// ============================================================================

/// Accepted input format; the fraction is optional
const PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Output format for whole seconds
const SECONDS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Output format when there are microseconds, always six digits
const MICROS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Format a timestamp the way the API and the object keys expect it
///
/// Whole seconds carry no fraction; anything else is written with exactly
/// six fractional digits. Sub-microsecond precision is dropped.
///
/// ```
/// use chrono::NaiveDate;
/// let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
///     .unwrap()
///     .and_hms_micro_opt(3, 4, 5, 120_000)
///     .unwrap();
/// assert_eq!(casesync::types::format_timestamp(&ts), "2024-01-02T03:04:05.120000");
/// ```
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    if ts.nanosecond() / 1_000 == 0 {
        ts.format(SECONDS_FORMAT).to_string()
    } else {
        ts.format(MICROS_FORMAT).to_string()
    }
}

/// Parse an API timestamp
///
/// Accepts `YYYY-MM-DDTHH:MM:SS`, with or without a fractional second
/// and with or without a trailing `Z`.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    let trimmed = value.trim();
    let without_zone = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    NaiveDateTime::parse_from_str(without_zone, PARSE_FORMAT).map_err(|_| Error::Timestamp {
        value: value.to_string(),
    })
}
