//! Execution engine module
//!
//! Main pull loop for one data type.
//!
//! # Overview
//!
//! The engine module provides:
//! - `PaginationEngine` - resolves the date range, optionally tunes the page
//!   limit, then pages through the API writing every non-empty page
//! - `RunContext` - per-run budgets and flags
//! - `PullStats` - counters for one data type's pull
//!
//! Every request, the adaptive probe included, is charged to the run's
//! request budget. Resumption state is written only after the loop finishes
//! and only when no override range was given.

mod types;

pub use types::{ApiBase, DateRange, DateRangeOverride, ErrorBudget, PullStats, RunContext};

use crate::config::{DataTypeSpec, Settings};
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use crate::limit::LimitCalculator;
use crate::pagination::{paginator_for, ApiPage, NextPage, PageRequest};
use crate::state::StateManager;
use crate::storage::{layout, BlobStore};
use crate::types::JsonValue;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Pull engine for one bucket and API
#[derive(Debug, Clone)]
pub struct PaginationEngine {
    /// HTTP client without a token; each run attaches its own
    client: HttpClient,
    store: BlobStore,
    state: StateManager,
    calculator: LimitCalculator,
    api: ApiBase,
}

impl PaginationEngine {
    /// Create an engine with default limits and the production API
    pub fn new(client: HttpClient, store: BlobStore) -> Self {
        Self {
            client,
            state: StateManager::new(store.clone()),
            store,
            calculator: LimitCalculator::default(),
            api: ApiBase::default(),
        }
    }

    /// Take limits and base URLs from operator settings
    #[must_use]
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.calculator = LimitCalculator::from(settings.limits);
        self.api = ApiBase::from(settings);
        self
    }

    /// Override the API base URLs
    #[must_use]
    pub fn with_api_base(mut self, api: ApiBase) -> Self {
        self.api = api;
        self
    }

    /// Override the limit calculator
    #[must_use]
    pub fn with_calculator(mut self, calculator: LimitCalculator) -> Self {
        self.calculator = calculator;
        self
    }

    /// Get the state manager
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Get the blob store
    pub fn store(&self) -> &BlobStore {
        &self.store
    }

    /// List endpoint for a data type
    pub fn api_url(&self, spec: &DataTypeSpec, run: &RunContext) -> String {
        self.api.url_for(spec, run)
    }

    /// Date range for a data type: the override, or last success up to the event time
    pub async fn resolve_date_range(
        &self,
        spec: &DataTypeSpec,
        run: &RunContext,
    ) -> Result<DateRange> {
        if let Some(ref custom) = run.date_range_override {
            return Ok(custom.range);
        }

        let start = self
            .state
            .last_successful_job_time(&run.scope(&spec.name))
            .await?
            .ok_or_else(|| Error::MissingRunState {
                data_type: spec.name.clone(),
            })?;
        Ok(DateRange::new(start, run.event_time))
    }

    async fn fetch(
        &self,
        client: &HttpClient,
        run: &mut RunContext,
        request: &PageRequest,
    ) -> Result<JsonValue> {
        run.record_request()?;
        info!(
            domain = %run.domain,
            url = %request.url,
            params = ?request.query,
            request = run.requests_made(),
            "Making request"
        );
        client
            .get_json(
                &request.url,
                RequestConfig::new().with_query(request.query.clone()),
            )
            .await
    }

    /// Page limit capped at the calculator's ceiling
    fn bounded_limit(&self, spec: &DataTypeSpec, limit: u32) -> u32 {
        let bounded = self.calculator.clamp(limit);
        if bounded != limit {
            warn!(
                data_type = %spec.name,
                limit,
                ceiling = self.calculator.ceiling(),
                "Page limit out of range, clamping"
            );
        }
        bounded
    }

    /// Probe the API once and pick the page limit for the main loop
    ///
    /// Starts from the stored limit, or the static one when none is stored,
    /// capped at the ceiling.
    pub async fn determine_limit(
        &self,
        client: &HttpClient,
        run: &mut RunContext,
        spec: &DataTypeSpec,
        range: DateRange,
    ) -> Result<u32> {
        let scope = run.scope(&spec.name);
        let current = match self.state.api_limit(&scope).await? {
            Some(limit) => self.bounded_limit(spec, limit),
            None => {
                debug!(data_type = %spec.name, "No stored api limit");
                self.bounded_limit(spec, spec.page_limit()?)
            }
        };

        let url = self.api_url(spec, run);
        let probe = paginator_for(spec, &url, current, range.start, range.end).initial_request();
        let body = self.fetch(client, run, &probe).await?;
        let size = serde_json::to_vec(&body)?.len();

        let limit = self.calculator.new_limit_for_bytes(current, size)?;
        info!(
            data_type = %spec.name,
            current,
            observed_bytes = size,
            new_limit = limit,
            "Limit recalculated"
        );
        self.state.save_api_limit(&scope, limit).await?;
        Ok(limit)
    }

    /// Pull one data type to completion
    pub async fn pull(&self, run: &mut RunContext, spec: &DataTypeSpec) -> Result<PullStats> {
        let start = Instant::now();
        let range = self.resolve_date_range(spec, run).await?;
        let client = self.client.for_token(run.token.clone());

        let limit = if spec.auto_determine_limit {
            self.determine_limit(&client, run, spec, range).await?
        } else {
            self.bounded_limit(spec, spec.page_limit()?)
        };

        let url = self.api_url(spec, run);
        let dir = run.output_dir(&spec.name);
        info!(
            domain = %run.domain,
            data_type = %spec.name,
            limit,
            output = %dir,
            "Starting pull"
        );

        let mut stats = PullStats::new(&spec.name, limit);
        let mut paginator = paginator_for(spec, &url, limit, range.start, range.end);
        let mut request = paginator.initial_request();

        loop {
            let body = self.fetch(&client, run, &request).await?;
            let page = ApiPage::from_value(&body)?;
            let outcome = paginator.process_page(&page)?;
            stats.add_page(page.len());

            if !page.is_empty() {
                let key = layout::join(&dir, &outcome.filename);
                let size = self.store.put_json(&key, &body).await?;
                stats.add_stored(size);
                info!(data_type = %spec.name, key = %key, records = page.len(), "Page stored");
            }

            match outcome.next {
                NextPage::Continue(next) => request = next,
                NextPage::Done => break,
            }
        }

        if run.date_range_override.is_none() {
            self.state
                .save_last_successful_job_time(&run.scope(&spec.name), &run.event_time)
                .await?;
        }

        info!(
            domain = %run.domain,
            data_type = %spec.name,
            pages = stats.pages_fetched,
            stored = stats.pages_stored,
            records = stats.records,
            requests = run.requests_made(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Pull finished"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests;
