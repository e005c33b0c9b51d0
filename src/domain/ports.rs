use super::schema::{IndexField, Schema};
use super::transaction::{Transaction, TransactionId};
use crate::error::StorageError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Store-level state persisted next to the records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMeta {
    pub schema_version: u32,
    pub indexes: Vec<IndexField>,
    /// Next id to hand out. Only ever grows.
    pub next_id: u64,
}

impl StoreMeta {
    pub fn new(schema: &Schema) -> Self {
        Self {
            schema_version: schema.version,
            indexes: schema.indexes.iter().copied().collect(),
            next_id: 1,
        }
    }
}

/// Everything a backend holds, as read when a store opens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub meta: Option<StoreMeta>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert or replace the record keyed by its id.
    Put(Transaction),
    Delete(TransactionId),
}

/// A unit of work that a backend must apply atomically: either the meta and
/// the optional record write both land, or neither does.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub meta: StoreMeta,
    pub op: Option<WriteOp>,
}

impl Commit {
    pub fn meta(meta: StoreMeta) -> Self {
        Self { meta, op: None }
    }

    pub fn put(meta: StoreMeta, tx: Transaction) -> Self {
        Self {
            meta,
            op: Some(WriteOp::Put(tx)),
        }
    }

    pub fn delete(meta: StoreMeta, id: TransactionId) -> Self {
        Self {
            meta,
            op: Some(WriteOp::Delete(id)),
        }
    }
}

/// Durable key-indexed substrate underneath a transaction store.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn load(&self) -> Result<PersistedState, StorageError>;
    async fn commit(&self, commit: Commit) -> Result<(), StorageError>;
}

pub type StorageBackendRef = Arc<dyn StorageBackend>;
pub type StorageBackendFactory = Box<dyn Fn() -> StorageBackendRef + Send + Sync>;
