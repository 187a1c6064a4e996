//! Pull orchestration across data types

use crate::config::DataTypeSpec;
use crate::engine::{PaginationEngine, PullStats, RunContext};
use crate::error::{Error, Result};
use serde::Serialize;
use tracing::{error, info, warn};

/// Outcome of a pull run that was not aborted
#[derive(Debug, Clone, Default, Serialize)]
pub struct PullReport {
    /// Data types pulled to completion
    pub completed: Vec<PullStats>,
    /// Data types without resumption state
    pub skipped: Vec<String>,
    /// Data types abandoned after a recoverable API failure
    pub failed: Vec<String>,
}

/// Runs the engine over every configured data type
#[derive(Debug, Clone)]
pub struct PullHandler {
    engine: PaginationEngine,
}

impl PullHandler {
    /// Create a pull handler
    pub fn new(engine: PaginationEngine) -> Self {
        Self { engine }
    }

    /// Get the engine
    pub fn engine(&self) -> &PaginationEngine {
        &self.engine
    }

    /// Pull each data type in order
    ///
    /// A recoverable API failure abandons the current data type and counts
    /// against the run's error budget; the run aborts once the budget is
    /// spent. A data type with no stored start time is skipped without
    /// counting. Any other error aborts the run.
    pub async fn run(&self, run: &mut RunContext, specs: &[DataTypeSpec]) -> Result<PullReport> {
        let mut report = PullReport::default();

        for spec in specs {
            match self.engine.pull(run, spec).await {
                Ok(stats) => {
                    run.errors.reset();
                    report.completed.push(stats);
                }
                Err(e) if e.is_missing_state() => {
                    warn!(
                        domain = %run.domain,
                        data_type = %spec.name,
                        "No last successful job time stored, skipping data type"
                    );
                    report.skipped.push(spec.name.clone());
                }
                Err(e) if e.is_recoverable() => {
                    error!(
                        domain = %run.domain,
                        data_type = %spec.name,
                        status = ?e.status(),
                        error = %e,
                        "Error making request to API"
                    );
                    if run.errors.record_failure() {
                        return Err(Error::ErrorBudgetExhausted {
                            failures: run.errors.failures(),
                            source: Box::new(e),
                        });
                    }
                    report.failed.push(spec.name.clone());
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            domain = %run.domain,
            completed = report.completed.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            requests = run.requests_made(),
            "Data pull finished"
        );
        Ok(report)
    }
}
