use crate::application::store::TransactionStore;
use crate::domain::ports::StorageBackendRef;
use crate::domain::schema::Schema;
use crate::error::{Result, StoreError};
use crate::infrastructure::in_memory::InMemoryBackend;
use crate::infrastructure::json_file::JsonFileBackend;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    #[default]
    Json,
    Rocksdb,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendKind,

    /// Data directory for the on-disk backends.
    #[serde(default = "default_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            backend: BackendKind::default(),
            path: default_path(),
        }
    }
}

fn default_path() -> PathBuf {
    PathBuf::from("money-log-data")
}

impl Config {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Reads the config file at `path`. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(StoreError::Config(format!(
                "cannot read {}: {e}",
                path.display()
            ))),
        }
    }

    pub fn backend(&self) -> Result<StorageBackendRef> {
        let storage = &self.storage;
        let backend: StorageBackendRef = match storage.backend {
            BackendKind::Memory => Arc::new(InMemoryBackend::new()),
            BackendKind::Json => Arc::new(JsonFileBackend::open(&storage.path)?),
            #[cfg(feature = "storage-rocksdb")]
            BackendKind::Rocksdb => Arc::new(crate::infrastructure::rocksdb::RocksDBStore::open(
                &storage.path,
            )?),
            #[cfg(not(feature = "storage-rocksdb"))]
            BackendKind::Rocksdb => {
                tracing::warn!(
                    path = %storage.path.display(),
                    "RocksDB storage requested, but the 'storage-rocksdb' feature is not enabled. Falling back to the JSON file backend."
                );
                Arc::new(JsonFileBackend::open(&storage.path)?)
            }
        };
        Ok(backend)
    }

    /// Builds the configured backend and opens a store with the current schema.
    pub async fn open_store(&self) -> Result<TransactionStore> {
        TransactionStore::open(self.backend()?, Schema::v1()).await
    }
}
