//! Configuration types
//!
//! Two layers live here:
//! - `Settings`: operator configuration loaded from YAML (bucket, URLs, budgets)
//! - `DataTypeSpec`: per-data-type API rules, parsed from the invocation
//!   payload's `api_info` and validated before any request is made

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue, Method};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// Data Type Specs
// ============================================================================

/// How a data type is paged through
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Pagination {
    /// Time window on a monotonic index field, advanced from the last object
    Indexed {
        /// Field ordered on, e.g. `indexed_on`
        field: String,
    },
    /// Opaque `meta.next` continuation supplied by the server
    Cursor {
        /// Prefix for `<prefix>_start` / `<prefix>_end` window params
        window_param: Option<String>,
    },
}

/// Raw data type definition as it appears on the wire
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataTypeDef {
    /// Resource name, e.g. "case"
    #[serde(default)]
    pub name: Option<String>,

    /// API version, e.g. "v0.5"
    #[serde(default)]
    pub version: Option<String>,

    /// Static page-size limit
    #[serde(default)]
    pub limit: Option<u32>,

    /// Use time-indexed pagination
    #[serde(default, alias = "uses_cursor_index")]
    pub uses_indexed_on: bool,

    /// Index field for time-indexed pagination
    #[serde(default)]
    pub index_field: Option<String>,

    /// Probe the API and tune the limit before paginating
    #[serde(default)]
    pub auto_determine_limit: bool,

    /// Verb used when pushing payloads
    #[serde(default)]
    pub method: Option<Method>,

    /// Send `include_archived=true` on time-indexed requests
    #[serde(default)]
    pub include_archived: Option<bool>,

    /// Window parameter prefix for cursor pagination
    #[serde(default)]
    pub window_param: Option<String>,
}

/// Direction a spec is validated for
///
/// Pulls need a page limit; pushes need a verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecUsage {
    Pull,
    Push,
}

/// Validated, immutable data type specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataTypeSpec {
    pub name: String,
    pub version: String,
    /// Static page-size limit; always set on pull specs
    pub limit: Option<u32>,
    pub pagination: Pagination,
    pub auto_determine_limit: bool,
    pub method: Method,
    pub include_archived: bool,
}

impl DataTypeSpec {
    /// Time-indexed spec with defaults for everything else
    pub fn indexed(name: impl Into<String>, version: impl Into<String>, limit: u32) -> Self {
        let name = name.into();
        Self {
            include_archived: name == "form",
            name,
            version: version.into(),
            limit: Some(limit),
            pagination: Pagination::Indexed {
                field: DEFAULT_INDEX_FIELD.to_string(),
            },
            auto_determine_limit: false,
            method: Method::GET,
        }
    }

    /// Cursor-paginated spec with defaults for everything else
    pub fn cursor(name: impl Into<String>, version: impl Into<String>, limit: u32) -> Self {
        let name = name.into();
        Self {
            pagination: Pagination::Cursor {
                window_param: default_window_param(&name),
            },
            include_archived: false,
            name,
            version: version.into(),
            limit: Some(limit),
            auto_determine_limit: false,
            method: Method::GET,
        }
    }

    /// Enable adaptive limits
    #[must_use]
    pub fn with_auto_limit(mut self) -> Self {
        self.auto_determine_limit = true;
        self
    }

    /// Set the push verb
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Whether this spec pages on a time index
    pub fn is_indexed(&self) -> bool {
        matches!(self.pagination, Pagination::Indexed { .. })
    }

    /// Static page limit, required for pulls
    pub fn page_limit(&self) -> Result<u32> {
        self.limit
            .ok_or_else(|| Error::missing_field(format!("api_info.{}.limit", self.name)))
    }

    /// Parse and validate one pull spec from a JSON value
    pub fn from_value(key: &str, value: &JsonValue) -> Result<Self> {
        Self::from_value_for(key, value, SpecUsage::Pull)
    }

    /// Parse and validate one spec from a JSON value for the given direction
    pub fn from_value_for(key: &str, value: &JsonValue, usage: SpecUsage) -> Result<Self> {
        let def: DataTypeDef = serde_json::from_value(value.clone())
            .map_err(|e| Error::invalid_value(format!("api_info.{key}"), e.to_string()))?;
        Self::try_from_def(key, def, usage)
    }

    /// Validate a raw definition, falling back to `key` when the name is absent
    pub fn try_from_def(key: &str, def: DataTypeDef, usage: SpecUsage) -> Result<Self> {
        let name = def
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| key.to_string());
        if name.trim().is_empty() {
            return Err(Error::missing_field("api_info.name"));
        }

        let version = def
            .version
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::missing_field(format!("api_info.{name}.version")))?;

        if usage == SpecUsage::Pull && def.limit.is_none() {
            return Err(Error::missing_field(format!("api_info.{name}.limit")));
        }
        if def.limit == Some(0) {
            return Err(Error::invalid_value(
                format!("api_info.{name}.limit"),
                "limit must be a positive integer",
            ));
        }

        let method = match (usage, def.method) {
            (_, Some(method)) => method,
            (SpecUsage::Pull, None) => Method::GET,
            (SpecUsage::Push, None) => {
                return Err(Error::missing_field(format!("api_info.{name}.method")))
            }
        };

        let pagination = if def.uses_indexed_on {
            Pagination::Indexed {
                field: def
                    .index_field
                    .unwrap_or_else(|| DEFAULT_INDEX_FIELD.to_string()),
            }
        } else {
            Pagination::Cursor {
                window_param: def.window_param.or_else(|| default_window_param(&name)),
            }
        };

        Ok(Self {
            include_archived: def.include_archived.unwrap_or(name == "form"),
            name,
            version,
            limit: def.limit,
            pagination,
            auto_determine_limit: def.auto_determine_limit,
            method,
        })
    }
}

/// Default index field for time-indexed pagination
pub const DEFAULT_INDEX_FIELD: &str = "indexed_on";

fn default_window_param(name: &str) -> Option<String> {
    (name == "action_times").then(|| "UTC_start_time".to_string())
}

/// Parse an `api_info` object into specs, keeping payload order
pub fn parse_api_info(api_info: &JsonObject, usage: SpecUsage) -> Result<Vec<DataTypeSpec>> {
    api_info
        .iter()
        .map(|(key, value)| DataTypeSpec::from_value_for(key, value, usage))
        .collect()
}

/// Built-in data type catalog
pub fn builtin_data_types() -> Vec<DataTypeSpec> {
    vec![
        DataTypeSpec::indexed("case", "v0.5", 5000),
        DataTypeSpec::indexed("form", "v0.5", 1000),
        DataTypeSpec::cursor("action_times", "v0.5", 1000),
        DataTypeSpec::cursor("location", "v0.5", 100),
        DataTypeSpec::cursor("fixture", "v0.5", 1000),
        DataTypeSpec::cursor("web-user", "v0.5", 1000),
    ]
}

/// Look up a built-in data type by name
pub fn get_builtin(name: &str) -> Option<DataTypeSpec> {
    builtin_data_types().into_iter().find(|d| d.name == name)
}

// ============================================================================
// Settings
// ============================================================================

/// Operator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Bucket that holds pulled pages, payloads and run state
    pub bucket: String,

    /// Production API base URL
    pub base_url: String,

    /// Staging API base URL
    pub staging_base_url: String,

    /// Maximum requests per run
    pub request_limit: u32,

    /// Recoverable API failures tolerated before a run aborts
    pub api_error_max: u32,

    /// Minutes subtracted from the event time when `use_lag` is set
    pub lag_minutes: i64,

    /// Adaptive limit settings
    pub limits: LimitSettings,

    /// HTTP client settings
    pub http: HttpSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bucket: "commcare-snowflake-data-sync".to_string(),
            base_url: "https://www.commcarehq.org".to_string(),
            staging_base_url: "https://staging.commcarehq.org".to_string(),
            request_limit: 1000,
            api_error_max: 3,
            lag_minutes: 5,
            limits: LimitSettings::default(),
            http: HttpSettings::default(),
        }
    }
}

/// Adaptive page-limit settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    /// Downstream file-size ceiling in MB
    pub max_file_size_mb: f64,
    /// Upper bound for any computed limit
    pub ceiling: u32,
    /// Safety multiplier applied to the computed limit (0, 1]
    pub grace_offset: f64,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_file_size_mb: 16.0,
            ceiling: 10_000,
            grace_offset: 0.5,
        }
    }
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Transport timeout per request
    pub timeout_seconds: u64,
    /// Optional request pacing, per second
    pub requests_per_second: Option<u32>,
    /// Optional request pacing, per minute; ignored when a per-second quota is set
    pub requests_per_minute: Option<u32>,
    /// User agent override
    pub user_agent: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 60,
            requests_per_second: None,
            requests_per_minute: None,
            user_agent: None,
        }
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read settings file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse settings from YAML
    pub fn from_yaml(content: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check invariants the engine relies on
    pub fn validate(&self) -> Result<()> {
        if self.bucket.trim().is_empty() {
            return Err(Error::missing_field("bucket"));
        }
        url::Url::parse(&self.base_url)?;
        url::Url::parse(&self.staging_base_url)?;
        if self.request_limit == 0 {
            return Err(Error::invalid_value("request_limit", "must be positive"));
        }
        if self.api_error_max == 0 {
            return Err(Error::invalid_value("api_error_max", "must be positive"));
        }
        if self.lag_minutes < 0 {
            return Err(Error::invalid_value("lag_minutes", "must not be negative"));
        }
        if self.limits.ceiling == 0 {
            return Err(Error::invalid_value("limits.ceiling", "must be positive"));
        }
        if !(self.limits.max_file_size_mb > 0.0) {
            return Err(Error::invalid_value(
                "limits.max_file_size_mb",
                "must be positive",
            ));
        }
        if !(self.limits.grace_offset > 0.0 && self.limits.grace_offset <= 1.0) {
            return Err(Error::invalid_value(
                "limits.grace_offset",
                "must be in (0, 1]",
            ));
        }
        if self.http.requests_per_second == Some(0) {
            return Err(Error::invalid_value(
                "http.requests_per_second",
                "must be positive when set",
            ));
        }
        if self.http.requests_per_minute == Some(0) {
            return Err(Error::invalid_value(
                "http.requests_per_minute",
                "must be positive when set",
            ));
        }
        Ok(())
    }
}
