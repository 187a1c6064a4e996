//! Engine types
//!
//! Per-run context, date ranges and statistics for the pull engine.

use crate::auth::ApiToken;
use crate::config::{DataTypeSpec, Settings};
use crate::error::{Error, Result};
use crate::state::StateScope;
use crate::storage::layout;
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

/// Inclusive time window a pull covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    /// Create a date range
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }
}

/// Operator-supplied range that replaces the stored resumption point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRangeOverride {
    pub range: DateRange,
    /// Output folder under `{domain}/snowflake-copy/`; the dated folder when absent
    pub folder: Option<String>,
}

/// Consecutive recoverable failures tolerated in one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorBudget {
    failures: u32,
    max: u32,
}

impl ErrorBudget {
    /// Create a budget allowing `max - 1` consecutive failures
    pub fn new(max: u32) -> Self {
        Self {
            failures: 0,
            max: max.max(1),
        }
    }

    /// Count a failure; true once the budget is spent
    pub fn record_failure(&mut self) -> bool {
        self.failures += 1;
        self.failures >= self.max
    }

    /// Clear the counter after a successful unit of work
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Current consecutive failure count
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Failure count that aborts the run
    pub fn max(&self) -> u32 {
        self.max
    }
}

impl Default for ErrorBudget {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Everything one invocation knows about its run
///
/// Built once at the start of an invocation and never persisted.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub domain: String,
    pub token: ApiToken,
    /// As-of time for the whole run
    pub event_time: NaiveDateTime,
    pub request_budget: u32,
    requests_made: u32,
    pub errors: ErrorBudget,
    pub date_range_override: Option<DateRangeOverride>,
    pub test_mode: bool,
    pub staging: bool,
}

impl RunContext {
    /// Create a run with default budgets
    pub fn new(domain: impl Into<String>, token: ApiToken, event_time: NaiveDateTime) -> Self {
        Self {
            domain: domain.into(),
            token,
            event_time,
            request_budget: 1000,
            requests_made: 0,
            errors: ErrorBudget::default(),
            date_range_override: None,
            test_mode: false,
            staging: false,
        }
    }

    /// Take budgets from operator settings
    #[must_use]
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.request_budget = settings.request_limit;
        self.errors = ErrorBudget::new(settings.api_error_max);
        self
    }

    /// Set the request budget
    #[must_use]
    pub fn with_request_budget(mut self, budget: u32) -> Self {
        self.request_budget = budget;
        self
    }

    /// Set the error budget
    #[must_use]
    pub fn with_error_max(mut self, max: u32) -> Self {
        self.errors = ErrorBudget::new(max);
        self
    }

    /// Shift the event time back
    #[must_use]
    pub fn with_lag(mut self, minutes: i64) -> Self {
        self.event_time -= Duration::minutes(minutes);
        self
    }

    /// Pull an explicit range instead of resuming
    #[must_use]
    pub fn with_date_range(mut self, range: DateRangeOverride) -> Self {
        self.date_range_override = Some(range);
        self
    }

    /// Write to the `-test` folders
    #[must_use]
    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    /// Target the staging server
    #[must_use]
    pub fn with_staging(mut self, staging: bool) -> Self {
        self.staging = staging;
        self
    }

    /// Requests issued so far
    pub fn requests_made(&self) -> u32 {
        self.requests_made
    }

    /// Claim one request from the budget
    pub fn record_request(&mut self) -> Result<()> {
        if self.requests_made >= self.request_budget {
            return Err(Error::RequestBudgetExhausted {
                domain: self.domain.clone(),
                budget: self.request_budget,
            });
        }
        self.requests_made += 1;
        Ok(())
    }

    /// State scope for a data type in this run
    pub fn scope(&self, data_type: &str) -> StateScope {
        StateScope::new(&self.domain, data_type, self.test_mode)
    }

    /// Folder pulled pages of a data type are written to
    pub fn output_dir(&self, data_type: &str) -> String {
        match self
            .date_range_override
            .as_ref()
            .and_then(|o| o.folder.as_deref())
        {
            Some(folder) => layout::custom_dir(&self.domain, folder),
            None => layout::pull_dir(&self.domain, data_type, self.test_mode, &self.event_time),
        }
    }
}

/// Base URLs of the remote API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBase {
    pub base_url: String,
    pub staging_base_url: String,
}

impl From<&Settings> for ApiBase {
    fn from(settings: &Settings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            staging_base_url: settings.staging_base_url.clone(),
        }
    }
}

impl Default for ApiBase {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl ApiBase {
    /// Point both production and staging at one server
    pub fn single(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            base_url: url.clone(),
            staging_base_url: url,
        }
    }

    /// `{base}/a/{domain}/api/{version}/{name}/`
    ///
    /// Staging runs use the staging server and drop a `staging-` domain prefix.
    pub fn url_for(&self, spec: &DataTypeSpec, run: &RunContext) -> String {
        let (base, domain) = if run.staging {
            (
                self.staging_base_url.as_str(),
                run.domain
                    .strip_prefix("staging-")
                    .unwrap_or(run.domain.as_str()),
            )
        } else {
            (self.base_url.as_str(), run.domain.as_str())
        };
        format!(
            "{}/a/{domain}/api/{}/{}/",
            base.trim_end_matches('/'),
            spec.version,
            spec.name
        )
    }
}

/// Statistics for one data type's pull
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PullStats {
    pub data_type: String,
    /// Page limit used for the main loop
    pub limit: u32,
    pub pages_fetched: usize,
    pub pages_stored: usize,
    pub records: usize,
    pub bytes_written: usize,
}

impl PullStats {
    /// Create empty stats
    pub fn new(data_type: impl Into<String>, limit: u32) -> Self {
        Self {
            data_type: data_type.into(),
            limit,
            ..Default::default()
        }
    }

    /// Count a fetched page
    pub fn add_page(&mut self, records: usize) {
        self.pages_fetched += 1;
        self.records += records;
    }

    /// Count a stored page
    pub fn add_stored(&mut self, bytes: usize) {
        self.pages_stored += 1;
        self.bytes_written += bytes;
    }
}
