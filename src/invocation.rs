//! Invocation entry point
//!
//! Turns one trigger payload into one run:
//!
//! ```json
//! {
//!   "domain": "demo",
//!   "operation_type": "cc_to_s3",
//!   "api_info": {"case": {"name": "case", "version": "v0.5", "limit": 5000, "uses_indexed_on": true}},
//!   "custom_date_range": {"start_time": "2024-01-01T00:00:00.000000Z", "end_time": "2024-01-02T00:00:00.000000Z"},
//!   "test_mode": false,
//!   "use_lag": true
//! }
//! ```
//!
//! A malformed payload yields a 400 result rather than an error; failures
//! during the run itself are returned as `Err`.

use crate::auth::fetch_api_token;
use crate::config::{parse_api_info, DataTypeSpec, Settings, SpecUsage};
use crate::engine::{ApiBase, DateRange, DateRangeOverride, PaginationEngine, RunContext};
use crate::error::{Error, Result};
use crate::handler::{PullHandler, PushHandler};
use crate::http::{HttpClient, HttpClientConfig};
use crate::params::ParameterStore;
use crate::storage::BlobStore;
use crate::types::{parse_timestamp, JsonObject, JsonValue};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

// ============================================================================
// Payload
// ============================================================================

/// Raw trigger payload; every field is checked in `validate`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvocationPayload {
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub operation_type: Option<String>,
    #[serde(default)]
    pub api_info: Option<JsonObject>,
    #[serde(default)]
    pub specifiers: Option<Vec<String>>,
    #[serde(default)]
    pub custom_date_range: Option<CustomDateRange>,
    #[serde(default)]
    pub test_mode: bool,
    #[serde(default)]
    pub use_lag: bool,
    #[serde(default)]
    pub is_staging: bool,
}

/// Explicit range in the payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomDateRange {
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub folder: Option<String>,
}

impl CustomDateRange {
    fn parse(&self) -> Result<DateRangeOverride> {
        let start = self
            .start_time
            .as_deref()
            .ok_or_else(|| Error::missing_field("custom_date_range.start_time"))?;
        let end = self
            .end_time
            .as_deref()
            .ok_or_else(|| Error::missing_field("custom_date_range.end_time"))?;

        let start = parse_timestamp(start)
            .map_err(|e| Error::invalid_value("custom_date_range.start_time", e.to_string()))?;
        let end = parse_timestamp(end)
            .map_err(|e| Error::invalid_value("custom_date_range.end_time", e.to_string()))?;
        if start > end {
            return Err(Error::invalid_value(
                "custom_date_range",
                "start_time is after end_time",
            ));
        }

        let folder = self
            .folder
            .as_deref()
            .map(|f| f.trim().trim_matches('/'))
            .filter(|f| !f.is_empty())
            .map(ToString::to_string);

        Ok(DateRangeOverride {
            range: DateRange::new(start, end),
            folder,
        })
    }
}

/// Direction of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    /// API to bucket
    #[serde(rename = "cc_to_s3")]
    Pull,
    /// Bucket to API
    #[serde(rename = "s3_to_cc")]
    Push,
}

impl OperationType {
    /// Validation rules for this direction's data type specs
    pub fn spec_usage(self) -> SpecUsage {
        match self {
            Self::Pull => SpecUsage::Pull,
            Self::Push => SpecUsage::Push,
        }
    }

    /// Parse the wire name
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cc_to_s3" => Some(Self::Pull),
            "s3_to_cc" => Some(Self::Push),
            _ => None,
        }
    }
}

/// A validated invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub domain: String,
    pub operation: OperationType,
    pub data_types: Vec<DataTypeSpec>,
    pub specifiers: Vec<String>,
    pub date_range: Option<DateRangeOverride>,
    pub test_mode: bool,
    pub use_lag: bool,
    pub staging: bool,
}

impl InvocationPayload {
    /// Decode a payload from JSON
    pub fn from_value(value: &JsonValue) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::config("Invocation payload must be a JSON object"));
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Check required fields and parse the data type specs
    pub fn validate(self) -> Result<Invocation> {
        let domain = self
            .domain
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| Error::missing_field("domain"))?;

        let operation_name = self
            .operation_type
            .ok_or_else(|| Error::config("Operation type was not specified in event data."))?;
        let operation = OperationType::parse(&operation_name)
            .ok_or_else(|| Error::config("Invalid operation_type was provided."))?;

        let api_info = self.api_info.ok_or_else(|| match operation {
            OperationType::Pull => Error::config("api_info was missing in event data."),
            OperationType::Push => {
                Error::config("api_info or specifiers were missing in event data.")
            }
        })?;
        let data_types = parse_api_info(&api_info, operation.spec_usage())?;

        let specifiers = match operation {
            OperationType::Push => self
                .specifiers
                .ok_or_else(|| Error::config("api_info or specifiers were missing in event data."))?,
            OperationType::Pull => self.specifiers.unwrap_or_default(),
        };

        let date_range = match (operation, self.custom_date_range) {
            (OperationType::Pull, Some(range)) => Some(range.parse()?),
            _ => None,
        };

        Ok(Invocation {
            domain,
            operation,
            data_types,
            specifiers,
            date_range,
            test_mode: self.test_mode,
            use_lag: self.use_lag,
            staging: self.is_staging,
        })
    }
}

// ============================================================================
// Result
// ============================================================================

/// Body of an invocation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultBody {
    pub message: String,
}

/// Status/message pair returned to the trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResult {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: ResultBody,
}

impl InvocationResult {
    /// 200 result
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            body: ResultBody {
                message: message.into(),
            },
        }
    }

    /// 400 result
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status_code: 400,
            body: ResultBody {
                message: message.into(),
            },
        }
    }

    /// 500 result for a run that aborted
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            status_code: 500,
            body: ResultBody {
                message: message.into(),
            },
        }
    }

    /// Whether the invocation succeeded
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

// ============================================================================
// Services
// ============================================================================

/// Clients shared by every invocation
#[derive(Clone)]
pub struct Services {
    pub store: BlobStore,
    pub params: Arc<dyn ParameterStore>,
    pub client: HttpClient,
    pub settings: Settings,
}

impl Services {
    /// Build services, creating the HTTP client from settings
    pub fn new(store: BlobStore, params: Arc<dyn ParameterStore>, settings: Settings) -> Result<Self> {
        let client = HttpClient::with_config(HttpClientConfig::from_settings(&settings.http))?;
        Ok(Self {
            store,
            params,
            client,
            settings,
        })
    }

    /// Point the API at a different server
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.settings.base_url = url.clone();
        self.settings.staging_base_url = url;
        self
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("store", &self.store.scheme())
            .field("client", &self.client)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Handling
// ============================================================================

/// Handle one invocation at `now`
pub async fn handle_invocation(
    payload: &JsonValue,
    services: &Services,
    now: NaiveDateTime,
) -> Result<InvocationResult> {
    let invocation = match InvocationPayload::from_value(payload).and_then(InvocationPayload::validate)
    {
        Ok(invocation) => invocation,
        Err(e) => {
            info!(error = %e, "Rejected invocation payload");
            return Ok(InvocationResult::bad_request(e.to_string()));
        }
    };

    info!(
        domain = %invocation.domain,
        operation = ?invocation.operation,
        data_types = invocation.data_types.len(),
        event_time = %now,
        "Processing domain"
    );

    match invocation.operation {
        OperationType::Pull => run_pull(&invocation, services, now).await,
        OperationType::Push => run_push(&invocation, services, now).await,
    }
}

async fn run_pull(
    invocation: &Invocation,
    services: &Services,
    now: NaiveDateTime,
) -> Result<InvocationResult> {
    let settings = &services.settings;
    let token = fetch_api_token(services.params.as_ref(), &invocation.domain, None).await?;

    let mut run = RunContext::new(&invocation.domain, token, now)
        .with_settings(settings)
        .with_test_mode(invocation.test_mode)
        .with_staging(invocation.staging);
    if invocation.use_lag {
        run = run.with_lag(settings.lag_minutes);
    }
    if let Some(ref range) = invocation.date_range {
        info!(start = %range.range.start, end = %range.range.end, "Specific date range specified");
        run = run.with_date_range(range.clone());
    }

    let engine = PaginationEngine::new(services.client.clone(), services.store.clone())
        .with_settings(settings);
    let report = PullHandler::new(engine)
        .run(&mut run, &invocation.data_types)
        .await?;

    info!(
        domain = %invocation.domain,
        completed = report.completed.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "Data pull for domain finished"
    );
    Ok(InvocationResult::ok("CommCare to S3 data pull successful."))
}

async fn run_push(
    invocation: &Invocation,
    services: &Services,
    now: NaiveDateTime,
) -> Result<InvocationResult> {
    let settings = &services.settings;
    let handler = PushHandler::new(
        services.client.clone(),
        services.store.clone(),
        ApiBase::from(settings),
    );

    for specifier in &invocation.specifiers {
        let token = fetch_api_token(
            services.params.as_ref(),
            &invocation.domain,
            Some(specifier.as_str()),
        )
        .await?;
        let mut run = RunContext::new(&invocation.domain, token, now)
            .with_settings(settings)
            .with_test_mode(invocation.test_mode)
            .with_staging(invocation.staging);

        let report = handler
            .run(&mut run, &invocation.data_types, specifier)
            .await?;
        info!(
            domain = %invocation.domain,
            specifier = %specifier,
            sent = report.completed.iter().map(|s| s.sent).sum::<usize>(),
            failed = report.failed.len(),
            "Data push for specifier finished"
        );
    }

    Ok(InvocationResult::ok("S3 to CommCare data push successful."))
}
