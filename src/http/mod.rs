//! HTTP client module
//!
//! Provides the transport used to talk to the remote API.
//!
//! # Features
//!
//! - **API key auth**: every request carries the run's token
//! - **Request pacing**: optional per-second or per-minute quota using governor
//! - **Response validation**: non-2xx responses become typed `Api` errors
//!
//! The client never retries; a failed call is reported to the caller, which
//! decides whether the run can continue.

mod client;
mod pacing;
pub mod validate;

pub use client::{ApiResponse, HttpClient, HttpClientConfig, RequestConfig};
pub use pacing::{Pacer, PacingConfig, PacingWindow};
pub use validate::process_response;
