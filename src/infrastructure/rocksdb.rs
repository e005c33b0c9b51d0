use crate::domain::ports::{Commit, PersistedState, StorageBackend, StoreMeta, WriteOp};
use crate::domain::transaction::Transaction;
use crate::error::{StorageError, StorageErrorKind};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;

/// Column Family for storing transaction records, keyed by big-endian id.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column Family for store metadata (schema and id counter).
pub const CF_META: &str = "meta";

const META_KEY: &[u8] = b"store";

/// A persistent backend implementation using RocksDB.
///
/// Records and metadata live in separate Column Families. Each commit is a
/// single `WriteBatch`, so a record and the counter it advanced are written
/// together or not at all.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_transactions = ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Options::default());
        let cf_meta = ColumnFamilyDescriptor::new(CF_META, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_transactions, cf_meta])
            .map_err(rocksdb_error)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::internal(format!("{name} column family not found")))
    }
}

fn rocksdb_error(e: rocksdb::Error) -> StorageError {
    let kind = match e.kind() {
        rocksdb::ErrorKind::Corruption => StorageErrorKind::Corrupted,
        _ => StorageErrorKind::Io,
    };
    StorageError::with_source(kind, "RocksDB operation failed", e)
}

fn decode_error(what: &str, e: serde_json::Error) -> StorageError {
    StorageError::with_source(
        StorageErrorKind::Corrupted,
        format!("Failed to deserialize {what}"),
        e,
    )
}

fn encode_error(what: &str, e: serde_json::Error) -> StorageError {
    StorageError::with_source(
        StorageErrorKind::Internal,
        format!("Failed to serialize {what}"),
        e,
    )
}

#[async_trait]
impl StorageBackend for RocksDBStore {
    async fn load(&self) -> Result<PersistedState, StorageError> {
        let meta = match self
            .db
            .get_cf(self.cf(CF_META)?, META_KEY)
            .map_err(rocksdb_error)?
        {
            Some(bytes) => Some(
                serde_json::from_slice::<StoreMeta>(&bytes)
                    .map_err(|e| decode_error("store metadata", e))?,
            ),
            None => None,
        };

        let mut transactions = Vec::new();
        let iter = self
            .db
            .iterator_cf(self.cf(CF_TRANSACTIONS)?, IteratorMode::Start);
        for item in iter {
            let (_key, value) = item.map_err(rocksdb_error)?;
            let tx: Transaction =
                serde_json::from_slice(&value).map_err(|e| decode_error("transaction", e))?;
            transactions.push(tx);
        }

        Ok(PersistedState { meta, transactions })
    }

    async fn commit(&self, commit: Commit) -> Result<(), StorageError> {
        let cf_transactions = self.cf(CF_TRANSACTIONS)?;
        let cf_meta = self.cf(CF_META)?;
        let mut batch = WriteBatch::default();

        match &commit.op {
            Some(WriteOp::Put(tx)) => {
                let id = tx.id.ok_or_else(|| {
                    StorageError::internal("cannot persist a transaction without id")
                })?;
                let value = serde_json::to_vec(tx).map_err(|e| encode_error("transaction", e))?;
                batch.put_cf(cf_transactions, id.value().to_be_bytes(), value);
            }
            Some(WriteOp::Delete(id)) => {
                batch.delete_cf(cf_transactions, id.value().to_be_bytes());
            }
            None => {}
        }

        let meta =
            serde_json::to_vec(&commit.meta).map_err(|e| encode_error("store metadata", e))?;
        batch.put_cf(cf_meta, META_KEY, meta);

        self.db.write(batch).map_err(rocksdb_error)
    }
}
