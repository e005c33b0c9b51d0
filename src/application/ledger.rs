use crate::application::store::{TransactionCursor, TransactionStore};
use crate::domain::query::{QueryOrder, TransactionFilter};
use crate::domain::transaction::{Transaction, TransactionId, TransactionPatch};
use crate::domain::validation::TransactionCandidate;
use crate::error::Result;

/// The surface UI code talks to: raw form data in, typed records out.
#[derive(Clone)]
pub struct MoneyLog {
    store: TransactionStore,
}

impl MoneyLog {
    pub fn new(store: TransactionStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &TransactionStore {
        &self.store
    }

    /// Validates the submitted data and records it as a new transaction.
    pub async fn create_transaction(&self, data: TransactionCandidate) -> Result<TransactionId> {
        let tx = Transaction::try_from(data)?;
        self.store.insert(tx).await
    }

    pub async fn edit_transaction(&self, id: TransactionId, data: TransactionPatch) -> Result<()> {
        self.store.update(id, data).await
    }

    pub async fn remove_transaction(&self, id: TransactionId) -> Result<()> {
        self.store.delete(id).await
    }

    pub async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        order: QueryOrder,
    ) -> TransactionCursor {
        self.store.query(filter, order).await
    }

    pub async fn get_transaction(&self, id: TransactionId) -> Result<Transaction> {
        self.store.get(id).await
    }
}
