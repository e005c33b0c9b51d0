#![allow(dead_code)]

use async_trait::async_trait;
use money_log::domain::ports::{Commit, PersistedState, StorageBackend};
use money_log::error::{StorageError, StorageErrorKind};
use money_log::infrastructure::in_memory::InMemoryBackend;
use money_log::{Receipt, ReceiptItem, Schema, Transaction, TransactionStore};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub const DAY_MS: i64 = 86_400_000;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn memory_store() -> TransactionStore {
    init_tracing();
    TransactionStore::open(Arc::new(InMemoryBackend::new()), Schema::v1())
        .await
        .expect("Failed to open in-memory store")
}

pub fn two_item_receipt() -> Receipt {
    Receipt::new(
        "Hardware Store",
        dec!(20),
        dec!(200),
        vec![
            ReceiptItem::new("Hammer", dec!(1), dec!(80)),
            ReceiptItem::new("Nails", dec!(4), dec!(25)),
        ],
    )
}

pub fn salary(day: i64) -> Transaction {
    Transaction::income(dec!(1000), "salary", day * DAY_MS)
}

/// Wraps an in-memory backend and fails commits while `failing` is set.
#[derive(Clone, Default)]
pub struct FlakyBackend {
    pub inner: InMemoryBackend,
    pub failing: Arc<AtomicBool>,
}

impl FlakyBackend {
    pub fn fail_commits(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageBackend for FlakyBackend {
    async fn load(&self) -> Result<PersistedState, StorageError> {
        self.inner.load().await
    }

    async fn commit(&self, commit: Commit) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::new(
                StorageErrorKind::QuotaExceeded,
                "simulated quota exhaustion",
            ));
        }
        self.inner.commit(commit).await
    }
}

/// Wraps an in-memory backend and delays every commit.
#[derive(Clone)]
pub struct SlowBackend {
    pub inner: InMemoryBackend,
    pub delay: Duration,
}

#[async_trait]
impl StorageBackend for SlowBackend {
    async fn load(&self) -> Result<PersistedState, StorageError> {
        self.inner.load().await
    }

    async fn commit(&self, commit: Commit) -> Result<(), StorageError> {
        tokio::time::sleep(self.delay).await;
        self.inner.commit(commit).await
    }
}
