use crate::application::index::IndexSet;
use crate::domain::ports::{Commit, StorageBackendRef, StoreMeta};
use crate::domain::query::{QueryOrder, TransactionFilter};
use crate::domain::schema::{MigrationPlan, Schema};
use crate::domain::transaction::{Transaction, TransactionId, TransactionKind, TransactionPatch};
use crate::domain::validation::validate;
use crate::error::{FieldIssue, Result, StorageError, StoreError, ValidationError};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// Persistent, indexed collection of transactions.
///
/// Cloning is cheap and every clone operates on the same store.
///
/// Mutations are serialized by a single writer lock that owns the store
/// metadata (schema and id counter). Each mutation commits to the backend
/// first and only then publishes the new record to readers, so a read sees
/// a record either entirely before or entirely after a write.
///
/// Mutations run on their own tokio task. Dropping the future returned by
/// [`insert`](Self::insert), [`update`](Self::update) or
/// [`delete`](Self::delete) does not abort the write; it either fails before
/// anything is committed or is applied in full.
#[derive(Clone)]
pub struct TransactionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    backend: StorageBackendRef,
    schema: Schema,
    writer: Mutex<StoreMeta>,
    state: RwLock<StoreState>,
}

struct StoreState {
    records: BTreeMap<TransactionId, Arc<Transaction>>,
    indexes: IndexSet,
}

impl TransactionStore {
    /// Opens a store over `backend`, reconciling `schema` with what is
    /// persisted and rebuilding the secondary indexes.
    ///
    /// Fails with [`StoreError::Migration`] before any operation is possible
    /// if the schema cannot be applied additively.
    pub async fn open(backend: StorageBackendRef, schema: Schema) -> Result<Self> {
        let persisted = backend.load().await?;
        let plan = schema.plan(persisted.meta.as_ref())?;

        let meta = match (&plan, persisted.meta) {
            (MigrationPlan::UpToDate, Some(meta)) => meta,
            (MigrationPlan::Upgrade { .. }, Some(meta)) => StoreMeta {
                next_id: meta.next_id,
                ..StoreMeta::new(&schema)
            },
            (MigrationPlan::Initialize, _) | (_, None) => StoreMeta::new(&schema),
        };

        // Nothing is written until every persisted record has been checked.
        let mut records = BTreeMap::new();
        let mut indexes = IndexSet::new(schema.indexes.iter().copied());
        for tx in persisted.transactions {
            let id = tx
                .id
                .ok_or_else(|| StorageError::corrupted("persisted transaction has no id"))?;
            if id.value() >= meta.next_id {
                return Err(StorageError::corrupted(format!(
                    "transaction {id} is beyond the id counter ({})",
                    meta.next_id
                ))
                .into());
            }
            indexes.insert(&tx);
            records.insert(id, Arc::new(tx));
        }

        match plan {
            MigrationPlan::UpToDate => {}
            MigrationPlan::Upgrade { from, added } => {
                backend.commit(Commit::meta(meta.clone())).await?;
                info!(
                    from,
                    to = schema.version,
                    added = ?added,
                    "Migrated transaction store schema"
                );
            }
            MigrationPlan::Initialize => {
                backend.commit(Commit::meta(meta.clone())).await?;
                info!(version = schema.version, "Initialized transaction store");
            }
        }

        info!(
            version = meta.schema_version,
            transactions = records.len(),
            "Opened transaction store"
        );

        Ok(Self {
            inner: Arc::new(StoreInner {
                backend,
                schema,
                writer: Mutex::new(meta),
                state: RwLock::new(StoreState { records, indexes }),
            }),
        })
    }

    /// The schema version in effect, which is also the persisted one.
    pub fn schema_version(&self) -> u32 {
        self.inner.schema.version
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// Validates and persists a new transaction, returning its assigned id.
    pub async fn insert(&self, tx: Transaction) -> Result<TransactionId> {
        self.detached(move |inner| async move { inner.insert(tx).await }).await
    }

    pub async fn get(&self, id: TransactionId) -> Result<Transaction> {
        let state = self.inner.state.read().await;
        state
            .records
            .get(&id)
            .map(|tx| Transaction::clone(tx))
            .ok_or(StoreError::NotFound(id))
    }

    /// Merges `patch` into the record and replaces it as a whole.
    pub async fn update(&self, id: TransactionId, patch: TransactionPatch) -> Result<()> {
        self.detached(move |inner| async move { inner.update(id, patch).await }).await
    }

    /// Removes the record. Deleting an absent id is [`StoreError::NotFound`].
    pub async fn delete(&self, id: TransactionId) -> Result<()> {
        self.detached(move |inner| async move { inner.delete(id).await }).await
    }

    /// Snapshot of the transactions matching `filter`, in `order`.
    ///
    /// Indexed predicates narrow the candidates; the rest are checked
    /// against each candidate. Later mutations do not affect the cursor.
    pub async fn query(&self, filter: &TransactionFilter, order: QueryOrder) -> TransactionCursor {
        let mut matched = {
            let state = self.inner.state.read().await;
            state.matching(filter)
        };
        matched.sort_by(|a, b| order.compare(a, b));
        TransactionCursor {
            inner: matched.into_iter(),
        }
    }

    pub async fn count(&self, filter: &TransactionFilter) -> usize {
        let state = self.inner.state.read().await;
        if filter.is_empty() {
            state.records.len()
        } else {
            state.matching(filter).len()
        }
    }

    async fn detached<F, Fut, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce(Arc<StoreInner>) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        tokio::spawn(op(Arc::clone(&self.inner)))
            .await
            .map_err(|e| {
                StoreError::Storage(StorageError::internal(format!(
                    "store operation did not complete: {e}"
                )))
            })?
    }
}

impl StoreInner {
    async fn insert(&self, mut tx: Transaction) -> Result<TransactionId> {
        if tx.id.is_some() {
            return Err(ValidationError::single("id", "is assigned by the store").into());
        }
        validate(&tx)?;

        let mut meta = self.writer.lock().await;
        let id = TransactionId(meta.next_id);
        let next_id = meta
            .next_id
            .checked_add(1)
            .ok_or_else(|| StorageError::internal("transaction id space exhausted"))?;
        let committed_meta = StoreMeta {
            next_id,
            ..meta.clone()
        };
        tx.id = Some(id);

        self.backend
            .commit(Commit::put(committed_meta.clone(), tx.clone()))
            .await?;
        *meta = committed_meta;

        let mut state = self.state.write().await;
        state.indexes.insert(&tx);
        state.records.insert(id, Arc::new(tx));
        debug!(%id, "Inserted transaction");
        Ok(id)
    }

    async fn update(&self, id: TransactionId, patch: TransactionPatch) -> Result<()> {
        let meta = self.writer.lock().await;
        let current = {
            let state = self.state.read().await;
            state
                .records
                .get(&id)
                .cloned()
                .ok_or(StoreError::NotFound(id))?
        };

        let updated = merge(&current, patch)?;
        validate(&updated)?;

        self.backend
            .commit(Commit::put(meta.clone(), updated.clone()))
            .await?;

        let mut state = self.state.write().await;
        state.indexes.remove(&current);
        state.indexes.insert(&updated);
        state.records.insert(id, Arc::new(updated));
        debug!(%id, "Updated transaction");
        Ok(())
    }

    async fn delete(&self, id: TransactionId) -> Result<()> {
        let meta = self.writer.lock().await;
        let current = {
            let state = self.state.read().await;
            state
                .records
                .get(&id)
                .cloned()
                .ok_or(StoreError::NotFound(id))?
        };

        self.backend.commit(Commit::delete(meta.clone(), id)).await?;

        let mut state = self.state.write().await;
        state.indexes.remove(&current);
        state.records.remove(&id);
        debug!(%id, "Deleted transaction");
        Ok(())
    }
}

impl StoreState {
    fn matching(&self, filter: &TransactionFilter) -> Vec<Arc<Transaction>> {
        match self.indexes.lookup(filter) {
            Some(ids) => ids
                .iter()
                .filter_map(|id| self.records.get(id))
                .filter(|tx| filter.matches(tx))
                .cloned()
                .collect(),
            None => self
                .records
                .values()
                .filter(|tx| filter.matches(tx))
                .cloned()
                .collect(),
        }
    }
}

/// Applies `patch` on top of `current`. The variant of a record never changes.
fn merge(
    current: &Transaction,
    patch: TransactionPatch,
) -> std::result::Result<Transaction, ValidationError> {
    let mut issues = Vec::new();
    let mut updated = current.clone();

    if let Some(kind) = patch.kind
        && kind != current.transaction_type()
    {
        issues.push(FieldIssue::new(
            "type",
            format!("cannot change a {} into a {kind}", current.transaction_type()),
        ));
    }
    if let Some(amount) = patch.amount {
        updated.amount = amount;
    }
    if let Some(description) = patch.description {
        updated.description = description;
    }
    if let Some(date) = patch.date {
        updated.date = date;
    }
    if let Some(receipt) = patch.receipt {
        match &mut updated.kind {
            TransactionKind::Expense { receipt: slot } => *slot = receipt,
            TransactionKind::Income => {
                if receipt.is_some() {
                    issues.push(FieldIssue::new("receipt", "only expenses carry a receipt"));
                }
            }
        }
    }

    if issues.is_empty() {
        Ok(updated)
    } else {
        Err(ValidationError::new(issues))
    }
}

/// Finite, snapshot-backed sequence of query results.
#[derive(Debug)]
pub struct TransactionCursor {
    inner: std::vec::IntoIter<Arc<Transaction>>,
}

impl Iterator for TransactionCursor {
    type Item = Transaction;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(Arc::unwrap_or_clone)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for TransactionCursor {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(Arc::unwrap_or_clone)
    }
}

impl ExactSizeIterator for TransactionCursor {}
