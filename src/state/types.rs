//! Resumption state types
//!
//! Each value is stored as a small text object next to the data it
//! describes, so an operator can inspect or reset it with plain bucket tools.

use crate::storage::layout;

/// A persisted resumption value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    /// Event time of the last pull that completed without an override range
    LastSuccessfulJobTime,
    /// Page limit chosen by the last adaptive probe
    ApiLimit,
}

impl StateKind {
    /// File stem of the state object
    pub fn stem(self) -> &'static str {
        match self {
            StateKind::LastSuccessfulJobTime => "last_successful_job_time",
            StateKind::ApiLimit => "api_limit",
        }
    }
}

/// The (domain, data type, test mode) triple that owns a set of state values
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateScope {
    pub domain: String,
    pub data_type: String,
    pub test_mode: bool,
}

impl StateScope {
    /// Create a scope
    pub fn new(domain: impl Into<String>, data_type: impl Into<String>, test_mode: bool) -> Self {
        Self {
            domain: domain.into(),
            data_type: data_type.into(),
            test_mode,
        }
    }

    /// Object key for one state value
    pub fn key(&self, kind: StateKind) -> String {
        layout::state_key(&self.domain, &self.data_type, self.test_mode, kind.stem())
    }
}
