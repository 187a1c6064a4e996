//! Object store client (S3, local filesystem, in-memory)

use crate::error::{Error, Result};
use crate::http::validate::store_error;
use crate::types::JsonValue;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::debug;

/// An object found by `BlobStore::list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Key relative to the store's prefix
    pub key: String,
    /// Size in bytes
    pub size: usize,
}

/// Blob storage for one bucket
#[derive(Debug, Clone)]
pub struct BlobStore {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// Key prefix within the bucket
    prefix: String,
    /// Original URL scheme for logging
    scheme: String,
}

impl BlobStore {
    /// Wrap an existing object store
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            prefix: String::new(),
            scheme: "custom".to_string(),
        }
    }

    /// In-memory store, used for tests and dry runs
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            prefix: String::new(),
            scheme: "memory".to_string(),
        }
    }

    /// S3 bucket with credentials and region from the environment
    pub fn s3(bucket: &str) -> Result<Self> {
        Self::parse(&format!("s3://{bucket}"))
    }

    /// Parse a store URL
    ///
    /// Supported formats:
    /// - `s3://bucket/prefix/` - AWS S3
    /// - `memory://` - in-memory store
    /// - `/local/path/`, `./path/` or `file:///path` - local filesystem
    pub fn parse(url: &str) -> Result<Self> {
        if let Some(rest) = url.strip_prefix("s3://") {
            Self::parse_s3(url, rest)
        } else if url.starts_with("memory://") {
            Ok(Self::in_memory())
        } else {
            Self::parse_local(url)
        }
    }

    fn parse_s3(url: &str, without_scheme: &str) -> Result<Self> {
        let (bucket, prefix) = match without_scheme.find('/') {
            Some(idx) => (
                &without_scheme[..idx],
                without_scheme[idx + 1..].trim_end_matches('/').to_string(),
            ),
            None => (without_scheme, String::new()),
        };
        if bucket.is_empty() {
            return Err(Error::config(format!("Invalid s3 URL: {url}")));
        }

        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| Error::config(format!("Failed to create s3 client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix,
            scheme: "s3".to_string(),
        })
    }

    fn parse_local(path: &str) -> Result<Self> {
        let path = path.strip_prefix("file://").unwrap_or(path);

        std::fs::create_dir_all(path)
            .map_err(|e| Error::config(format!("Failed to create directory {path}: {e}")))?;

        let store = LocalFileSystem::new_with_prefix(path)
            .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix: String::new(),
            scheme: "file".to_string(),
        })
    }

    /// Get the scheme (s3, file, memory, custom)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    fn path(&self, key: &str) -> ObjectPath {
        if self.prefix.is_empty() {
            ObjectPath::from(key)
        } else {
            ObjectPath::from(format!("{}/{key}", self.prefix))
        }
    }

    /// Write bytes under `key`
    pub async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let path = self.path(key);
        let size = data.len();
        self.store
            .put(&path, data.into())
            .await
            .map_err(|e| store_error(key, e))?;
        debug!(scheme = %self.scheme, key, size, "Object written");
        Ok(())
    }

    /// Write a string under `key`
    pub async fn put_text(&self, key: &str, text: &str) -> Result<()> {
        self.put(key, Bytes::from(text.to_string())).await
    }

    /// Serialize a JSON value and write it under `key`, returning its size
    pub async fn put_json(&self, key: &str, value: &JsonValue) -> Result<usize> {
        let data = serde_json::to_vec(value)?;
        let size = data.len();
        self.put(key, Bytes::from(data)).await?;
        Ok(size)
    }

    /// Read the object at `key`; a missing key is `Error::NotFound`
    pub async fn get(&self, key: &str) -> Result<Bytes> {
        let path = self.path(key);
        let result = self
            .store
            .get(&path)
            .await
            .map_err(|e| store_error(key, e))?;
        result.bytes().await.map_err(|e| store_error(key, e))
    }

    /// Read the object at `key` as UTF-8
    pub async fn get_text(&self, key: &str) -> Result<String> {
        let data = self.get(key).await?;
        String::from_utf8(data.to_vec())
            .map_err(|e| Error::storage(key, format!("Object is not valid UTF-8: {e}")))
    }

    /// Read the object at `key`, mapping a missing key to `None`
    pub async fn get_text_opt(&self, key: &str) -> Result<Option<String>> {
        match self.get_text(key).await {
            Ok(text) => Ok(Some(text)),
            Err(Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// List every object under `prefix`, sorted by key
    pub async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>> {
        let path = self.path(prefix);
        let metas: Vec<_> = self
            .store
            .list(Some(&path))
            .try_collect()
            .await
            .map_err(|e| store_error(prefix, e))?;

        let strip = if self.prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", self.prefix)
        };

        let mut objects: Vec<StoredObject> = metas
            .into_iter()
            .map(|meta| {
                let full = meta.location.to_string();
                let key = full.strip_prefix(&strip).unwrap_or(&full).to_string();
                StoredObject {
                    key,
                    size: meta.size,
                }
            })
            .collect();
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }
}
