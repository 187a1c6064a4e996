//! Pagination module
//!
//! Supports: time-indexed windows and server cursors
//!
//! # Overview
//!
//! Both strategies sit behind the `Paginator` trait so the engine runs a
//! single loop: issue the request, hand the page to the paginator, store
//! the page under the filename it returns, follow `NextPage` until `Done`.
//! The server's `meta.next` is authoritative for whether another page exists.

mod strategies;
mod types;

pub use strategies::{paginator_for, CursorPaginator, IndexedPaginator};
pub use types::{ApiPage, NextPage, PageMeta, PageOutcome, PageRequest, Paginator};
