use money_log::{
    QueryOrder, StoreError, Transaction, TransactionFilter, TransactionPatch, TransactionType,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;

mod common;
use common::{DAY_MS, memory_store, salary, two_item_receipt};

#[tokio::test]
async fn test_round_trip_preserves_record() {
    let store = memory_store().await;
    let expense = Transaction::expense(dec!(200), "tools", 2 * DAY_MS, Some(two_item_receipt()));

    let id = store.insert(expense.clone()).await.unwrap();
    let stored = store.get(id).await.unwrap();

    assert_eq!(stored, expense.with_id(id));
}

#[tokio::test]
async fn test_ids_unique_and_never_reused() {
    let store = memory_store().await;
    let mut seen = HashSet::new();
    let mut live = Vec::new();
    let mut rng = StdRng::seed_from_u64(7);

    for round in 0..200 {
        if !live.is_empty() && rng.gen_bool(0.3) {
            let victim = live.swap_remove(rng.gen_range(0..live.len()));
            store.delete(victim).await.unwrap();
        } else {
            let id = store.insert(salary(round)).await.unwrap();
            assert!(seen.insert(id), "id {id} was handed out twice");
            live.push(id);
        }
    }

    assert_eq!(store.count(&TransactionFilter::new()).await, live.len());
}

#[tokio::test]
async fn test_delete_is_terminal() {
    let store = memory_store().await;
    let id = store.insert(salary(1)).await.unwrap();

    store.delete(id).await.unwrap();

    assert!(matches!(store.get(id).await, Err(StoreError::NotFound(missing)) if missing == id));
    assert!(
        store
            .update(id, TransactionPatch::new().amount(dec!(1)))
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert!(store.delete(id).await.unwrap_err().is_not_found());

    let next = store.insert(salary(2)).await.unwrap();
    assert_ne!(next, id);
}

#[tokio::test]
async fn test_expense_query_sorted_with_stable_ties() {
    let store = memory_store().await;
    let mut rng = StdRng::seed_from_u64(42);
    let mut expected = Vec::new();

    for _ in 0..100 {
        let date = rng.gen_range(0..10) * DAY_MS;
        let amount = Decimal::from(rng.gen_range(1..500i64));
        let tx = if rng.gen_bool(0.5) {
            Transaction::income(amount, "", date)
        } else {
            Transaction::expense(amount, "", date, None)
        };
        let is_expense = tx.transaction_type() == TransactionType::Expense;
        let id = store.insert(tx).await.unwrap();
        if is_expense {
            expected.push((date, id));
        }
    }
    // Stable sort keeps insertion order for equal dates.
    expected.sort_by_key(|(date, _)| *date);

    let result: Vec<_> = store
        .query(
            &TransactionFilter::new().kind(TransactionType::Expense),
            QueryOrder::date_ascending(),
        )
        .await
        .map(|tx| (tx.date, tx.id.unwrap()))
        .collect();

    assert_eq!(result, expected);
}

#[tokio::test]
async fn test_descending_is_reverse_of_ascending() {
    let store = memory_store().await;
    for day in [3, 1, 2, 1] {
        store.insert(salary(day)).await.unwrap();
    }

    let ascending: Vec<_> = store
        .query(&TransactionFilter::new(), QueryOrder::date_ascending())
        .await
        .collect();
    let mut descending: Vec<_> = store
        .query(&TransactionFilter::new(), QueryOrder::date_descending())
        .await
        .collect();
    descending.reverse();

    assert_eq!(ascending, descending);
}

#[tokio::test]
async fn test_validation_gate_creates_nothing() {
    let store = memory_store().await;
    let mut receipt = two_item_receipt();
    receipt.items[0].quantity = dec!(-1);
    let invalid = Transaction::expense(dec!(10), "", 0, Some(receipt));

    let err = store.insert(invalid).await.unwrap_err();

    match err {
        StoreError::Validation(e) => assert!(e.has_field("receipt.items[0].quantity")),
        other => panic!("expected a validation error, got {other:?}"),
    }
    assert_eq!(store.count(&TransactionFilter::new()).await, 0);
}

#[tokio::test]
async fn test_income_then_expense_scenario() {
    let store = memory_store().await;
    let income_id = store.insert(salary(1)).await.unwrap();
    let expense_id = store
        .insert(Transaction::expense(
            dec!(200),
            "hardware",
            2 * DAY_MS,
            Some(two_item_receipt()),
        ))
        .await
        .unwrap();

    let listed: Vec<_> = store
        .query(&TransactionFilter::new(), QueryOrder::date_ascending())
        .await
        .collect();

    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, Some(income_id));
    assert_eq!(listed[0].transaction_type(), TransactionType::Income);
    assert_eq!(listed[0].amount, dec!(1000));
    assert_eq!(listed[1].id, Some(expense_id));
    assert_eq!(listed[1].amount, dec!(200));

    let expense = store.get(expense_id).await.unwrap();
    assert_eq!(expense.receipt().unwrap().items.len(), 2);
}

#[tokio::test]
async fn test_compound_filters() {
    let store = memory_store().await;
    store.insert(salary(1)).await.unwrap();
    store
        .insert(Transaction::expense(dec!(30), "groceries", DAY_MS, None))
        .await
        .unwrap();
    let wanted = store
        .insert(Transaction::expense(
            dec!(200),
            "groceries",
            3 * DAY_MS,
            Some(two_item_receipt()),
        ))
        .await
        .unwrap();
    store
        .insert(Transaction::expense(dec!(250), "rent", 3 * DAY_MS, None))
        .await
        .unwrap();

    let filter = TransactionFilter::new()
        .kind(TransactionType::Expense)
        .date_between(2 * DAY_MS, 4 * DAY_MS)
        .amount_between(dec!(100), dec!(300))
        .description_is("groceries")
        .has_receipt(true);
    let hits: Vec<_> = store
        .query(&filter, QueryOrder::default())
        .await
        .map(|tx| tx.id)
        .collect();
    assert_eq!(hits, vec![Some(wanted)]);

    let without_receipt = TransactionFilter::new()
        .kind(TransactionType::Expense)
        .has_receipt(false);
    assert_eq!(store.count(&without_receipt).await, 2);
}

#[tokio::test]
async fn test_duplicate_and_extreme_dates_tolerated() {
    let store = memory_store().await;
    for date in [-50 * 365 * DAY_MS, 0, 0, 200 * 365 * DAY_MS] {
        store
            .insert(Transaction::income(dec!(1), "", date))
            .await
            .unwrap();
    }

    let dates: Vec<_> = store
        .query(&TransactionFilter::new(), QueryOrder::date_ascending())
        .await
        .map(|tx| tx.date)
        .collect();
    assert_eq!(dates, vec![-50 * 365 * DAY_MS, 0, 0, 200 * 365 * DAY_MS]);
}

#[tokio::test]
async fn test_clearing_receipt_through_patch() {
    let store = memory_store().await;
    let id = store
        .insert(Transaction::expense(dec!(200), "", 0, Some(two_item_receipt())))
        .await
        .unwrap();

    store
        .update(id, TransactionPatch::new().receipt(None))
        .await
        .unwrap();

    assert!(!store.get(id).await.unwrap().has_receipt());
    assert_eq!(
        store
            .count(&TransactionFilter::new().has_receipt(true))
            .await,
        0
    );
}

#[tokio::test]
async fn test_full_replacement_through_patch() {
    let store = memory_store().await;
    let id = store.insert(salary(1)).await.unwrap();

    let replacement = Transaction::income(dec!(1200), "raise", 5 * DAY_MS);
    store
        .update(id, TransactionPatch::from(replacement.clone()))
        .await
        .unwrap();

    assert_eq!(store.get(id).await.unwrap(), replacement.with_id(id));
}
