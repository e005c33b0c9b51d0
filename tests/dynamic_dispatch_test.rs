use money_log::domain::ports::StorageBackendRef;
use money_log::infrastructure::in_memory::InMemoryBackend;
use money_log::infrastructure::json_file::JsonFileBackend;
use money_log::{Schema, Transaction, TransactionStore};
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::test]
async fn test_backends_as_trait_objects() {
    let dir = tempfile::tempdir().unwrap();
    let backends: Vec<StorageBackendRef> = vec![
        Arc::new(InMemoryBackend::new()) as StorageBackendRef,
        Arc::new(JsonFileBackend::open(dir.path()).unwrap()) as StorageBackendRef,
    ];

    for backend in backends {
        let store = TransactionStore::open(backend, Schema::v1()).await.unwrap();

        // Verify Send + Sync by using the store from a spawned task
        let handle = tokio::spawn(async move {
            let id = store
                .insert(Transaction::income(dec!(100.0), "salary", 0))
                .await
                .unwrap();
            store.get(id).await.unwrap()
        });

        let retrieved = handle.await.unwrap();
        assert_eq!(retrieved.amount, dec!(100.0));
    }
}
