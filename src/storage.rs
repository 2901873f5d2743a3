//! Key/value persistence
//!
//! Each key is a logical namespace (the environment list, the settings
//! document) holding one JSON document. [`JsonFileStore`] keeps one
//! pretty-printed file per key in a data directory.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;
use tracing::debug;

/// Storage backend consumed by the save queue
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the document stored under `key`; `Ok(None)` when nothing was stored yet
    async fn read(&self, key: &str) -> io::Result<Option<Value>>;

    /// Replace the document stored under `key`
    async fn write(&self, key: &str, data: &Value) -> io::Result<()>;
}

/// One JSON file per key inside a directory
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the file backing `key`
    ///
    /// Keys are plain names; anything that could escape the data directory is rejected.
    pub fn file_path(&self, key: &str) -> io::Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid storage key '{}'", key),
            ));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn read(&self, key: &str) -> io::Result<Option<Value>> {
        let path = self.file_path(key)?;

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let data = serde_json::from_str(&content)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(Some(data))
    }

    async fn write(&self, key: &str, data: &Value) -> io::Result<()> {
        let path = self.file_path(key)?;
        let content = serde_json::to_string_pretty(data).map_err(io::Error::other)?;

        fs::create_dir_all(&self.dir).await?;

        // Write a sibling file first so a crash never leaves a truncated document
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &path).await?;

        debug!("Wrote {}", path.display());
        Ok(())
    }
}

/// Volatile store, for running without a data directory
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current document under `key`
    pub fn get(&self, key: &str) -> Option<Value> {
        self.data
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn read(&self, key: &str) -> io::Result<Option<Value>> {
        Ok(self.get(key))
    }

    async fn write(&self, key: &str, data: &Value) -> io::Result<()> {
        self.data
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), data.clone());
        Ok(())
    }
}
