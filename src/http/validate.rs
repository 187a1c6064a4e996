//! Response validation
//!
//! Normalizes transport results into either a parsed payload or a typed
//! failure. Two shapes are handled:
//! - API responses: 2xx bodies become JSON, anything else is `Error::Api`
//! - store responses: status codes and `object_store` errors become
//!   `NotFound` / `ParameterNotFound` or a fatal storage error

use super::client::ApiResponse;
use crate::error::{Error, Result};
use crate::types::JsonValue;

/// Validate an API response and parse its JSON body
///
/// An empty successful body is returned as an empty JSON object.
pub fn process_response(response: &ApiResponse) -> Result<JsonValue> {
    if !response.is_success() {
        return Err(Error::api(response.status, response.reason.clone()));
    }
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(JsonValue::Object(serde_json::Map::new()));
    }
    serde_json::from_slice(&response.body)
        .map_err(|e| Error::decode(format!("Response body is not valid JSON: {e}")))
}

/// Validate a parameter store status code
pub fn check_store_status(name: &str, status: u16, body: &str) -> Result<()> {
    match status {
        200 => Ok(()),
        404 => Err(Error::ParameterNotFound {
            name: name.to_string(),
        }),
        400 if body.contains("ParameterNotFound") => Err(Error::ParameterNotFound {
            name: name.to_string(),
        }),
        _ => Err(Error::parameter_store(
            name,
            format!("Request failed! Code: {status}."),
        )),
    }
}

/// Map an object store failure for `key` into the crate's taxonomy
pub fn store_error(key: &str, err: object_store::Error) -> Error {
    match err {
        object_store::Error::NotFound { .. } => Error::NotFound {
            key: key.to_string(),
        },
        other => Error::storage(key, other.to_string()),
    }
}
