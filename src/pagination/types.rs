//! Pagination types and traits
//!
//! Defines the page envelope returned by the API and the `Paginator` trait
//! both strategies implement.

use crate::error::{Error, Result};
use crate::types::{JsonValue, QueryParams};
use serde::{Deserialize, Serialize};

/// `meta` block of a list response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// Continuation; null or empty on the last page
    #[serde(default)]
    pub next: Option<String>,

    /// Page limit the server applied
    #[serde(default)]
    pub limit: Option<u64>,
}

/// One page of a list response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiPage {
    #[serde(default)]
    pub meta: PageMeta,
    #[serde(default)]
    pub objects: Vec<JsonValue>,
}

impl ApiPage {
    /// Decode a page from a response body
    pub fn from_value(value: &JsonValue) -> Result<Self> {
        if !value.get("meta").is_some_and(JsonValue::is_object) {
            return Err(Error::decode("Response has no 'meta' object"));
        }
        ApiPage::deserialize(value)
            .map_err(|e| Error::decode(format!("Response is not a list page: {e}")))
    }

    /// Non-empty continuation token
    pub fn next_token(&self) -> Option<&str> {
        self.meta
            .next
            .as_deref()
            .map(str::trim)
            .filter(|next| !next.is_empty())
    }

    /// Whether the server reported another page
    pub fn has_next(&self) -> bool {
        self.next_token().is_some()
    }

    /// Number of records on the page
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the page holds no records
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// A request the engine should issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Absolute URL
    pub url: String,
    /// Query parameters; empty when the URL already carries a continuation
    pub query: QueryParams,
}

impl PageRequest {
    /// Create a request
    pub fn new(url: impl Into<String>, query: QueryParams) -> Self {
        Self {
            url: url.into(),
            query,
        }
    }
}

/// Result of the next page computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// More pages available with this request
    Continue(PageRequest),
    /// No more pages
    Done,
}

/// What to do with a page that just arrived
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    /// Filename the page is stored under
    pub filename: String,
    /// Where to go next
    pub next: NextPage,
}

/// Core trait for pagination strategies
///
/// A paginator owns the cursor for one data type's pull. It hands out the
/// first request, then consumes each page in order and decides the next one.
pub trait Paginator: Send {
    /// The first request of the pull
    fn initial_request(&self) -> PageRequest;

    /// Consume a page, advancing the cursor
    fn process_page(&mut self, page: &ApiPage) -> Result<PageOutcome>;
}
