use super::StoreImage;
use crate::domain::ports::{Commit, PersistedState, StorageBackend};
use crate::error::StorageError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory storage backend.
///
/// Clones share the same contents, so a store can be dropped and opened
/// again over a clone to simulate a restart. Nothing survives the process.
#[derive(Default, Clone)]
pub struct InMemoryBackend {
    image: Arc<RwLock<StoreImage>>,
}

impl InMemoryBackend {
    /// Creates a new, empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    async fn load(&self) -> Result<PersistedState, StorageError> {
        let image = self.image.read().await;
        Ok(image.to_persisted())
    }

    async fn commit(&self, commit: Commit) -> Result<(), StorageError> {
        let mut image = self.image.write().await;
        image.apply(commit)
    }
}
