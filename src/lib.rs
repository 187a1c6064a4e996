// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # casesync
//!
//! Moves records between a case-management HTTP API and an object store.
//!
//! ## Features
//!
//! - **Paginated pull**: time-indexed windows or server cursors, one loop
//! - **Resumption**: last successful job time stored next to the data
//! - **Adaptive limits**: page size tuned so files stay under a size ceiling
//! - **Error budget**: a run tolerates a few failed data types before aborting
//! - **Push**: stored payloads replayed as API calls
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use casesync::{handle_invocation, BlobStore, InMemoryParameterStore, Services, Settings};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> casesync::Result<()> {
//!     let params = InMemoryParameterStore::from_pairs([("demo-api-key", "user:key")]);
//!     let services = Services::new(BlobStore::in_memory(), Arc::new(params), Settings::default())?;
//!
//!     let payload = serde_json::json!({
//!         "domain": "demo",
//!         "operation_type": "cc_to_s3",
//!         "api_info": {"case": {"version": "v0.5", "limit": 5000, "uses_indexed_on": true}}
//!     });
//!     let result = handle_invocation(&payload, &services, chrono::Utc::now().naive_utc()).await?;
//!     println!("{}", result.body.message);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Invocation (payload → result)                   │
//! └─────────────────────────────────────────────────────────────────┘
//!                 │                               │
//!        ┌────────┴────────┐             ┌────────┴────────┐
//!        │   PullHandler   │             │   PushHandler   │
//!        └────────┬────────┘             └────────┬────────┘
//!        ┌────────┴────────┐                      │
//!        │PaginationEngine │                      │
//!        └────────┬────────┘                      │
//! ┌──────────┬────┴──────┬───────────┬────────────┴─┬─────────────┐
//! │  Params  │   HTTP    │ Paginate  │    State     │   Storage   │
//! ├──────────┼───────────┼───────────┼──────────────┼─────────────┤
//! │ In-memory│ ApiKey    │ Indexed   │ Last success │ S3          │
//! │ Lambda   │ Pacing    │ Cursor    │ Api limit    │ Local       │
//! │ extension│ Validation│           │              │ In-memory   │
//! └──────────┴───────────┴───────────┴──────────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Settings and data type specs
pub mod config;

/// API key authentication
pub mod auth;

/// Parameter store clients
pub mod params;

/// HTTP client with pacing and response validation
pub mod http;

/// Object storage
pub mod storage;

/// Adaptive page-size limits
pub mod limit;

/// Resumption state
pub mod state;

/// Pagination strategies
pub mod pagination;

/// Main pull engine
pub mod engine;

/// Pull and push handlers
pub mod handler;

/// Invocation payloads and results
pub mod invocation;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{DataTypeSpec, Settings};
pub use engine::{PaginationEngine, RunContext};
pub use invocation::{handle_invocation, InvocationResult, Services};
pub use params::{InMemoryParameterStore, ParameterStore};
pub use storage::BlobStore;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
