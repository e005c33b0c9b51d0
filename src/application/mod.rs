//! Application layer: the transaction store and the facade UI code calls.
//!
//! `TransactionStore` owns the records, their secondary indexes and the id
//! counter, and delegates durability to a `StorageBackend`. `MoneyLog`
//! wraps it with the operations the excluded UI screens use.

pub mod index;
pub mod ledger;
pub mod store;
