//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sync case-management API data to and from an object store
#[derive(Parser, Debug)]
#[command(name = "casesync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (YAML)
    #[arg(short, long, global = true)]
    pub settings: Option<PathBuf>,

    /// Bucket URL: s3://bucket/prefix, memory://, or a local path
    /// (default: the settings bucket on S3)
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Parameter file (JSON object of name to value); without it parameters
    /// are read through the Lambda parameters extension
    #[arg(long, global = true)]
    pub params: Option<PathBuf>,

    /// API base URL, overriding both production and staging
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one invocation payload
    Invoke {
        /// Payload file (JSON)
        #[arg(long, conflicts_with = "payload_json")]
        payload: Option<PathBuf>,

        /// Inline payload JSON
        #[arg(long)]
        payload_json: Option<String>,
    },

    /// Start HTTP server mode
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// List built-in data types
    DataTypes,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Pretty,
}
