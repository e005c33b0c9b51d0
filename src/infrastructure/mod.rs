//! Storage backends.
//!
//! `InMemoryBackend` is volatile, `JsonFileBackend` keeps a JSON image on
//! disk and `RocksDBStore` (feature `storage-rocksdb`) uses RocksDB column
//! families.

pub mod in_memory;
pub mod json_file;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;

use crate::domain::ports::{Commit, PersistedState, StoreMeta, WriteOp};
use crate::domain::transaction::{Transaction, TransactionId};
use crate::error::StorageError;
use std::collections::BTreeMap;

/// Keyed copy of a backend's contents that commits are applied to.
#[derive(Debug, Clone, Default)]
pub(crate) struct StoreImage {
    meta: Option<StoreMeta>,
    transactions: BTreeMap<TransactionId, Transaction>,
}

impl StoreImage {
    pub(crate) fn apply(&mut self, commit: Commit) -> Result<(), StorageError> {
        match commit.op {
            Some(WriteOp::Put(tx)) => {
                let id = tx.id.ok_or_else(|| {
                    StorageError::internal("cannot persist a transaction without id")
                })?;
                self.transactions.insert(id, tx);
            }
            Some(WriteOp::Delete(id)) => {
                self.transactions.remove(&id);
            }
            None => {}
        }
        self.meta = Some(commit.meta);
        Ok(())
    }

    pub(crate) fn to_persisted(&self) -> PersistedState {
        PersistedState {
            meta: self.meta.clone(),
            transactions: self.transactions.values().cloned().collect(),
        }
    }
}

impl TryFrom<PersistedState> for StoreImage {
    type Error = StorageError;

    fn try_from(state: PersistedState) -> Result<Self, Self::Error> {
        let mut transactions = BTreeMap::new();
        for tx in state.transactions {
            let id = tx
                .id
                .ok_or_else(|| StorageError::corrupted("persisted transaction has no id"))?;
            if transactions.insert(id, tx).is_some() {
                return Err(StorageError::corrupted(format!(
                    "transaction {id} is persisted twice"
                )));
            }
        }
        Ok(Self {
            meta: state.meta,
            transactions,
        })
    }
}
