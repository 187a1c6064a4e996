//! Push stored payloads back to the API

use crate::config::DataTypeSpec;
use crate::engine::{ApiBase, RunContext};
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use crate::storage::{layout, BlobStore};
use crate::types::JsonValue;
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Counters for one (data type, specifier) push
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushStats {
    pub data_type: String,
    pub specifier: String,
    /// Payloads sent
    pub sent: usize,
    /// Zero-length objects skipped
    pub skipped_empty: usize,
}

/// Outcome of a push run that was not aborted
#[derive(Debug, Clone, Default, Serialize)]
pub struct PushReport {
    pub completed: Vec<PushStats>,
    /// Data types abandoned after a recoverable API failure
    pub failed: Vec<String>,
}

/// Replays `{domain}/payload/{specifier}/YYYY/MM/DD/HH/` as API calls
#[derive(Debug, Clone)]
pub struct PushHandler {
    client: HttpClient,
    store: BlobStore,
    api: ApiBase,
}

impl PushHandler {
    /// Create a push handler
    pub fn new(client: HttpClient, store: BlobStore, api: ApiBase) -> Self {
        Self { client, store, api }
    }

    /// Push every payload for the run's event hour, one request at a time
    pub async fn push(
        &self,
        run: &mut RunContext,
        spec: &DataTypeSpec,
        specifier: &str,
    ) -> Result<PushStats> {
        let mut stats = PushStats {
            data_type: spec.name.clone(),
            specifier: specifier.to_string(),
            ..Default::default()
        };

        let dir = layout::push_dir(&run.domain, specifier, &run.event_time);
        let objects = self.store.list(&dir).await?;
        if objects.is_empty() {
            info!(domain = %run.domain, specifier, folder = %dir, "No payloads found, nothing to push");
            return Ok(stats);
        }

        let url = self.api.url_for(spec, run);
        let client = self.client.for_token(run.token.clone());
        let total = objects.len();
        info!(
            domain = %run.domain,
            data_type = %spec.name,
            specifier,
            url = %url,
            payloads = total,
            "Starting data push"
        );

        for (n, object) in objects.iter().enumerate() {
            if object.size == 0 {
                warn!(key = %object.key, "Skipping empty object in payload folder");
                stats.skipped_empty += 1;
                continue;
            }

            let raw = self.store.get(&object.key).await?;
            let payload: JsonValue = serde_json::from_slice(&raw).map_err(|e| {
                Error::decode(format!("Payload '{}' is not valid JSON: {e}", object.key))
            })?;

            run.record_request()?;
            debug!(method = %spec.method, request = n + 1, total, key = %object.key, "Sending payload");
            let response = client
                .request_json(spec.method.into(), &url, RequestConfig::new().json(payload))
                .await?;

            info!(
                data_type = %spec.name,
                method = %spec.method,
                key = %object.key,
                form_id = ?response.get("form_id"),
                "Payload sent"
            );
            stats.sent += 1;
        }

        info!(
            domain = %run.domain,
            data_type = %spec.name,
            specifier,
            sent = stats.sent,
            "Data push finished"
        );
        Ok(stats)
    }

    /// Push each data type for one specifier, under the run's error budget
    pub async fn run(
        &self,
        run: &mut RunContext,
        specs: &[DataTypeSpec],
        specifier: &str,
    ) -> Result<PushReport> {
        let mut report = PushReport::default();

        for spec in specs {
            match self.push(run, spec, specifier).await {
                Ok(stats) => {
                    run.errors.reset();
                    report.completed.push(stats);
                }
                Err(e) if e.is_recoverable() => {
                    error!(
                        domain = %run.domain,
                        data_type = %spec.name,
                        specifier,
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

        Ok(report)
    }
}
