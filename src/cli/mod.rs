//! CLI module
//!
//! Command-line interface for running syncs.
//!
//! # Commands
//!
//! - `invoke` - Run one invocation payload
//! - `serve` - Start HTTP server mode
//! - `data-types` - List built-in data types

mod commands;
mod runner;
mod server;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
pub use server::{router, serve, ServerConfig};
