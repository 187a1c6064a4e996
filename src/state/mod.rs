//! State management module
//!
//! Persists what a pull needs to resume on the next run:
//! - `last_successful_job_time`: the event time of the last complete pull,
//!   used as the start of the next date range
//! - `api_limit`: the page limit picked by the last adaptive probe
//!
//! Values are scoped by (domain, data type, test mode). Nothing here locks;
//! overlapping runs on the same scope race on these writes.

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{StateKind, StateScope};

#[cfg(test)]
mod manager_tests;
