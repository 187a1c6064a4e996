//! Pagination strategy implementations
//!
//! Two strategies cover every data type:
//! - `IndexedPaginator`: a time window on a monotonic index field, chained
//!   forward from the last object of each page
//! - `CursorPaginator`: the server's opaque `meta.next` continuation

use super::types::{ApiPage, NextPage, PageOutcome, PageRequest, Paginator};
use crate::config::{DataTypeSpec, Pagination};
use crate::error::{Error, Result};
use crate::storage::layout;
use crate::types::{format_timestamp, parse_timestamp, QueryParams};
use chrono::NaiveDateTime;
use tracing::debug;
use url::Url;

// ============================================================================
// Indexed Pagination
// ============================================================================

/// Time-indexed pagination
///
/// Requests carry `order_by=<field>`, `<field>_start` and `<field>_end`.
/// While the server reports more pages, the next `<field>_start` is the
/// index value of the last object received; `<field>_end` never changes.
#[derive(Debug, Clone)]
pub struct IndexedPaginator {
    data_type: String,
    url: String,
    field: String,
    base_query: QueryParams,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl IndexedPaginator {
    /// Create an indexed paginator over `[start, end]`
    pub fn new(
        data_type: impl Into<String>,
        url: impl Into<String>,
        field: impl Into<String>,
        limit: u32,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Self {
        let field = field.into();
        let mut base_query = QueryParams::new();
        base_query.insert("limit".to_string(), limit.to_string());
        base_query.insert("order_by".to_string(), field.clone());
        Self {
            data_type: data_type.into(),
            url: url.into(),
            field,
            base_query,
            start,
            end,
        }
    }

    /// Also request archived records
    #[must_use]
    pub fn with_include_archived(mut self, include: bool) -> Self {
        if include {
            self.base_query
                .insert("include_archived".to_string(), "true".to_string());
        }
        self
    }

    /// Current window start
    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    fn current_request(&self) -> PageRequest {
        let mut query = self.base_query.clone();
        query.insert(format!("{}_start", self.field), format_timestamp(&self.start));
        query.insert(format!("{}_end", self.field), format_timestamp(&self.end));
        PageRequest::new(self.url.clone(), query)
    }

    fn last_index(&self, page: &ApiPage) -> Result<NaiveDateTime> {
        let last = page.objects.last().ok_or_else(|| {
            Error::pagination(&self.data_type, "page reports more results but has no objects")
        })?;
        let raw = last
            .get(&self.field)
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                Error::pagination(
                    &self.data_type,
                    format!("last object has no '{}' timestamp", self.field),
                )
            })?;
        parse_timestamp(raw)
    }
}

impl Paginator for IndexedPaginator {
    fn initial_request(&self) -> PageRequest {
        self.current_request()
    }

    fn process_page(&mut self, page: &ApiPage) -> Result<PageOutcome> {
        let segment_start = format_timestamp(&self.start);

        if !page.has_next() {
            return Ok(PageOutcome {
                filename: layout::segment_filename(
                    &self.data_type,
                    &segment_start,
                    &format_timestamp(&self.end),
                ),
                next: NextPage::Done,
            });
        }

        // The window must move forward or the same request would repeat
        let boundary = self.last_index(page)?;
        if boundary <= self.start {
            return Err(Error::pagination(
                &self.data_type,
                format!(
                    "'{}' did not advance past {} (last object at {})",
                    self.field,
                    segment_start,
                    format_timestamp(&boundary)
                ),
            ));
        }

        self.start = boundary;
        let segment_end = format_timestamp(&boundary);
        debug!(
            data_type = %self.data_type,
            next_start = %segment_end,
            "Continuing to next page"
        );

        Ok(PageOutcome {
            filename: layout::segment_filename(&self.data_type, &segment_start, &segment_end),
            next: NextPage::Continue(self.current_request()),
        })
    }
}

// ============================================================================
// Cursor Pagination
// ============================================================================

/// Cursor pagination on `meta.next`
///
/// The first request carries `limit` and, for data types with a time window,
/// `<prefix>_start` / `<prefix>_end`. Every later request is the API URL
/// resolved against `meta.next` with no other parameters.
#[derive(Debug, Clone)]
pub struct CursorPaginator {
    data_type: String,
    url: String,
    query: QueryParams,
    window_start: String,
    window_end: String,
    sequence: u32,
}

impl CursorPaginator {
    /// Create a cursor paginator; the window labels the stored files
    pub fn new(
        data_type: impl Into<String>,
        url: impl Into<String>,
        limit: u32,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Self {
        let mut query = QueryParams::new();
        query.insert("limit".to_string(), limit.to_string());
        Self {
            data_type: data_type.into(),
            url: url.into(),
            query,
            window_start: format_timestamp(&start),
            window_end: format_timestamp(&end),
            sequence: 0,
        }
    }

    /// Send the window as `<prefix>_start` / `<prefix>_end`
    #[must_use]
    pub fn with_window_param(mut self, prefix: Option<&str>) -> Self {
        if let Some(prefix) = prefix {
            self.query
                .insert(format!("{prefix}_start"), self.window_start.clone());
            self.query
                .insert(format!("{prefix}_end"), self.window_end.clone());
        }
        self
    }

    /// Pages consumed so far
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    fn resolve_next(&self, next: &str) -> Result<String> {
        let base = Url::parse(&self.url)?;
        Ok(base.join(next)?.to_string())
    }
}

impl Paginator for CursorPaginator {
    fn initial_request(&self) -> PageRequest {
        PageRequest::new(self.url.clone(), self.query.clone())
    }

    fn process_page(&mut self, page: &ApiPage) -> Result<PageOutcome> {
        self.sequence += 1;
        let filename = layout::sequence_filename(
            &self.data_type,
            &self.window_start,
            &self.window_end,
            self.sequence,
        );

        let next = match page.next_token() {
            Some(token) => {
                let url = self.resolve_next(token)?;
                debug!(data_type = %self.data_type, url = %url, "Continuing to next page");
                NextPage::Continue(PageRequest::new(url, QueryParams::new()))
            }
            None => NextPage::Done,
        };

        Ok(PageOutcome { filename, next })
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Build the paginator a data type's strategy calls for
pub fn paginator_for(
    spec: &DataTypeSpec,
    url: &str,
    limit: u32,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Box<dyn Paginator> {
    match &spec.pagination {
        Pagination::Indexed { field } => Box::new(
            IndexedPaginator::new(&spec.name, url, field, limit, start, end)
                .with_include_archived(spec.include_archived),
        ),
        Pagination::Cursor { window_param } => Box::new(
            CursorPaginator::new(&spec.name, url, limit, start, end)
                .with_window_param(window_param.as_deref()),
        ),
    }
}
