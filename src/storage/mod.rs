//! Object storage module
//!
//! Pulled pages, push payloads and resumption state all live in one bucket.
//!
//! # Overview
//!
//! - `BlobStore` - put/get/list of byte blobs over any `object_store` backend
//! - `layout` - the key scheme shared by the pull and push directions

mod client;
pub mod layout;

pub use client::{BlobStore, StoredObject};
