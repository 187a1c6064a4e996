//! Run handlers
//!
//! - `PullHandler` - API to bucket, one engine pull per data type
//! - `PushHandler` - bucket to API, one request per stored payload
//!
//! Both apply the same error budget: recoverable API failures are counted
//! and the run aborts when the count reaches the configured maximum.

mod pull;
mod push;

pub use pull::{PullHandler, PullReport};
pub use push::{PushHandler, PushReport, PushStats};
