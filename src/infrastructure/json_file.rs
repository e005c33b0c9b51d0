use super::StoreImage;
use crate::domain::ports::{Commit, PersistedState, StorageBackend};
use crate::error::{StorageError, StorageErrorKind};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::debug;

/// File holding the store image inside the data directory.
pub const DATA_FILE: &str = "transactions.json";

/// A durable backend that keeps the whole store in one JSON file.
///
/// Every commit writes a complete new image to a temporary file in the same
/// directory, syncs it and renames it over the previous one, so the file on
/// disk is always either the old or the new image.
pub struct JsonFileBackend {
    path: PathBuf,
    image: Mutex<StoreImage>,
}

impl JsonFileBackend {
    /// Opens or creates the data directory at `dir` and reads its image.
    ///
    /// An image that does not decode is reported as corrupted rather than
    /// being replaced.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StorageError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(DATA_FILE);

        let image = match std::fs::read(&path) {
            Ok(bytes) => {
                let state: PersistedState = serde_json::from_slice(&bytes).map_err(|e| {
                    StorageError::with_source(
                        StorageErrorKind::Corrupted,
                        format!("cannot decode {}", path.display()),
                        e,
                    )
                })?;
                StoreImage::try_from(state)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreImage::default(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), "Opened JSON file backend");
        Ok(Self {
            path,
            image: Mutex::new(image),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StorageBackend for JsonFileBackend {
    async fn load(&self) -> Result<PersistedState, StorageError> {
        let image = self.image.lock().await;
        Ok(image.to_persisted())
    }

    async fn commit(&self, commit: Commit) -> Result<(), StorageError> {
        let mut image = self.image.lock().await;
        let mut next = image.clone();
        next.apply(commit)?;

        let bytes = serde_json::to_vec(&next.to_persisted()).map_err(|e| {
            StorageError::with_source(StorageErrorKind::Internal, "cannot encode store image", e)
        })?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(|e| {
                StorageError::internal(format!("file write task did not complete: {e}"))
            })??;

        *image = next;
        Ok(())
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let dir = path
        .parent()
        .ok_or_else(|| StorageError::internal("data file has no parent directory"))?;
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| StorageError::from(e.error))?;
    Ok(())
}
