//! State manager implementation
//!
//! Reads and writes resumption values in the sync bucket. A missing object
//! is a valid initial state; any other store failure propagates.

use super::types::{StateKind, StateScope};
use crate::error::{Error, Result};
use crate::storage::BlobStore;
use crate::types::{format_timestamp, parse_timestamp};
use chrono::NaiveDateTime;
use tracing::{debug, info};

/// State manager backed by the object store
#[derive(Debug, Clone)]
pub struct StateManager {
    store: BlobStore,
}

impl StateManager {
    /// Create a state manager over a bucket
    pub fn new(store: BlobStore) -> Self {
        Self { store }
    }

    /// The underlying store
    pub fn store(&self) -> &BlobStore {
        &self.store
    }

    async fn read(&self, scope: &StateScope, kind: StateKind) -> Result<Option<String>> {
        let key = scope.key(kind);
        let value = self.store.get_text_opt(&key).await?;
        match value.as_deref().map(str::trim) {
            None | Some("") => {
                debug!(key = %key, "No stored state");
                Ok(None)
            }
            Some(text) => Ok(Some(text.to_string())),
        }
    }

    async fn write(&self, scope: &StateScope, kind: StateKind, value: &str) -> Result<()> {
        let key = scope.key(kind);
        self.store.put_text(&key, value).await?;
        info!(key = %key, value, "State saved");
        Ok(())
    }

    /// Last successful job time, if one was ever recorded
    pub async fn last_successful_job_time(
        &self,
        scope: &StateScope,
    ) -> Result<Option<NaiveDateTime>> {
        match self.read(scope, StateKind::LastSuccessfulJobTime).await? {
            Some(text) => parse_timestamp(&text).map(Some).map_err(|_| {
                Error::state(format!(
                    "Stored last successful job time for '{}' is not a timestamp: {text}",
                    scope.data_type
                ))
            }),
            None => Ok(None),
        }
    }

    /// Record the event time of a completed pull
    pub async fn save_last_successful_job_time(
        &self,
        scope: &StateScope,
        event_time: &NaiveDateTime,
    ) -> Result<()> {
        self.write(
            scope,
            StateKind::LastSuccessfulJobTime,
            &format_timestamp(event_time),
        )
        .await
    }

    /// Page limit chosen by the last adaptive probe
    pub async fn api_limit(&self, scope: &StateScope) -> Result<Option<u32>> {
        match self.read(scope, StateKind::ApiLimit).await? {
            Some(text) => match text.parse::<u32>() {
                Ok(limit) if limit > 0 => Ok(Some(limit)),
                _ => Err(Error::state(format!(
                    "Stored api limit for '{}' is not a positive integer: {text}",
                    scope.data_type
                ))),
            },
            None => Ok(None),
        }
    }

    /// Persist a page limit
    pub async fn save_api_limit(&self, scope: &StateScope, limit: u32) -> Result<()> {
        self.write(scope, StateKind::ApiLimit, &limit.to_string())
            .await
    }
}
