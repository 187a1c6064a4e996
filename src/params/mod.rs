//! Parameter store clients
//!
//! Small string-valued operational parameters (API tokens, operator knobs)
//! are read from a parameter store keyed by name.
//!
//! # Overview
//!
//! - `ParameterStore` - the trait the rest of the crate depends on
//! - `InMemoryParameterStore` - map-backed store for tests and local runs
//! - `ExtensionParameterStore` - AWS Parameters and Secrets Lambda extension

mod extension;
mod store;

pub use extension::{ExtensionParameterStore, ExtensionParameterStoreConfig};
pub use store::{InMemoryParameterStore, ParameterStore};
