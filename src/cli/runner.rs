//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::cli::server::{serve, ServerConfig};
use crate::config::{builtin_data_types, Settings};
use crate::error::{Error, Result, ResultExt};
use crate::invocation::{handle_invocation, InvocationResult, Services};
use crate::params::{
    ExtensionParameterStore, ExtensionParameterStoreConfig, InMemoryParameterStore,
    ParameterStore,
};
use crate::storage::BlobStore;
use crate::types::JsonValue;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Invoke {
                payload,
                payload_json,
            } => {
                self.invoke(payload.as_deref(), payload_json.as_deref())
                    .await
            }
            Commands::Serve { port } => {
                let config = ServerConfig {
                    services: self.services()?,
                };
                serve(config, *port).await
            }
            Commands::DataTypes => self.data_types(),
        }
    }

    /// Load settings, falling back to defaults
    fn settings(&self) -> Result<Settings> {
        match &self.cli.settings {
            Some(path) => Settings::from_file(path),
            None => Ok(Settings::default()),
        }
    }

    fn store(&self, settings: &Settings) -> Result<BlobStore> {
        match &self.cli.store {
            Some(url) => BlobStore::parse(url),
            None => BlobStore::s3(&settings.bucket),
        }
    }

    fn params(&self) -> Result<Arc<dyn ParameterStore>> {
        match &self.cli.params {
            Some(path) => Ok(Arc::new(InMemoryParameterStore::from_file(path)?)),
            None => Ok(Arc::new(ExtensionParameterStore::new(
                ExtensionParameterStoreConfig::from_env(),
            )?)),
        }
    }

    /// Build the clients an invocation needs
    pub fn services(&self) -> Result<Services> {
        let settings = self.settings()?;
        let store = self.store(&settings)?;
        let services = Services::new(store, self.params()?, settings)?;
        Ok(match &self.cli.base_url {
            Some(url) => services.with_base_url(url),
            None => services,
        })
    }

    fn load_payload(path: Option<&Path>, inline: Option<&str>) -> Result<JsonValue> {
        let content = match (path, inline) {
            (Some(path), _) => fs::read_to_string(path).map_err(|e| {
                Error::config(format!("Failed to read payload '{}': {e}", path.display()))
            })?,
            (None, Some(json)) => json.to_string(),
            (None, None) => {
                return Err(Error::config(
                    "No payload given (use --payload or --payload-json)",
                ))
            }
        };
        serde_json::from_str::<JsonValue>(&content).context("Payload is not valid JSON")
    }

    /// Run one invocation and print its result
    async fn invoke(&self, path: Option<&Path>, inline: Option<&str>) -> Result<()> {
        let payload = Self::load_payload(path, inline)?;
        let services = self.services()?;
        let now = chrono::Utc::now().naive_utc();

        let result = handle_invocation(&payload, &services, now).await?;
        self.print_result(&result)?;
        Ok(())
    }

    fn print_result(&self, result: &InvocationResult) -> Result<()> {
        match self.cli.format {
            OutputFormat::Json => println!("{}", serde_json::to_string(result)?),
            OutputFormat::Pretty => {
                println!("{} {}", result.status_code, result.body.message);
            }
        }
        Ok(())
    }

    /// Print the built-in data type catalog
    fn data_types(&self) -> Result<()> {
        let data_types = builtin_data_types();
        match self.cli.format {
            OutputFormat::Json => {
                let catalog: Vec<JsonValue> = data_types
                    .iter()
                    .map(|d| {
                        json!({
                            "name": d.name,
                            "version": d.version,
                            "limit": d.limit,
                            "uses_indexed_on": d.is_indexed(),
                            "pagination": d.pagination,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&catalog)?);
            }
            OutputFormat::Pretty => {
                println!("{:<14} {:<8} {:>6}  PAGINATION", "NAME", "VERSION", "LIMIT");
                for d in &data_types {
                    let pagination = if d.is_indexed() { "indexed" } else { "cursor" };
                    let limit = d.limit.map_or_else(|| "-".to_string(), |l| l.to_string());
                    println!(
                        "{:<14} {:<8} {:>6}  {pagination}",
                        d.name, d.version, limit
                    );
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_load_payload_inline() {
        let value = Runner::load_payload(None, Some(r#"{"domain": "demo"}"#)).unwrap();
        assert_eq!(value["domain"], "demo");
    }

    #[test]
    fn test_load_payload_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"domain": "demo"}}"#).unwrap();
        let value = Runner::load_payload(Some(file.path()), None).unwrap();
        assert_eq!(value["domain"], "demo");
    }

    #[test]
    fn test_load_payload_missing() {
        assert!(matches!(
            Runner::load_payload(None, None),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_load_payload_invalid_json() {
        let err = Runner::load_payload(None, Some("{domain")).unwrap_err();
        assert!(err.to_string().starts_with("Payload is not valid JSON"));
    }

    #[test]
    fn test_services_from_flags() {
        let mut params = tempfile::NamedTempFile::new().unwrap();
        write!(params, r#"{{"demo-api-key": "k"}}"#).unwrap();
        let params_path = params.path().to_str().unwrap().to_string();

        let cli = Cli::parse_from([
            "casesync",
            "--store",
            "memory://",
            "--params",
            params_path.as_str(),
            "--base-url",
            "http://localhost:9999",
            "data-types",
        ]);
        let services = Runner::new(cli).services().unwrap();
        assert_eq!(services.store.scheme(), "memory");
        assert_eq!(services.settings.base_url, "http://localhost:9999");
        assert_eq!(services.settings.staging_base_url, "http://localhost:9999");
    }
}
