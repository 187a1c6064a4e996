//! Parameter store trait and in-memory implementation

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Read/write access to named string parameters
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Fetch a parameter; a missing name is `Error::ParameterNotFound`
    async fn get(&self, name: &str) -> Result<String>;

    /// Store a parameter; without `overwrite` an existing name is an error
    async fn put(&self, name: &str, value: &str, overwrite: bool) -> Result<()>;
}

/// Map-backed parameter store
#[derive(Debug, Clone, Default)]
pub struct InMemoryParameterStore {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryParameterStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with the given pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: Arc::new(RwLock::new(values)),
        }
    }

    /// Seed a store from a JSON object of string values
    pub fn from_json(json: &str) -> Result<Self> {
        let values: HashMap<String, String> = serde_json::from_str(json).map_err(|e| {
            Error::config(format!("Parameter file must be a JSON object of strings: {e}"))
        })?;
        Ok(Self::from_pairs(values))
    }

    /// Seed a store from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read parameter file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json(&contents)
    }

    /// Number of stored parameters
    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.values.read().await.is_empty()
    }
}

#[async_trait]
impl ParameterStore for InMemoryParameterStore {
    async fn get(&self, name: &str) -> Result<String> {
        self.values
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ParameterNotFound {
                name: name.to_string(),
            })
    }

    async fn put(&self, name: &str, value: &str, overwrite: bool) -> Result<()> {
        let mut values = self.values.write().await;
        if !overwrite && values.contains_key(name) {
            return Err(Error::parameter_store(name, "ParameterAlreadyExists"));
        }
        values.insert(name.to_string(), value.to_string());
        Ok(())
    }
}
