//! Offline, single-user ledger of income and expense transactions.
//!
//! [`TransactionStore`] persists transactions through a pluggable
//! [`StorageBackend`](domain::ports::StorageBackend), keeps secondary indexes
//! over type, amount, description, date and receipt presence, and gates the
//! on-disk schema version. [`MoneyLog`] is the facade UI code calls.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::ledger::MoneyLog;
pub use application::store::{TransactionCursor, TransactionStore};
pub use domain::query::{OrderBy, QueryOrder, SortOrder, TransactionFilter};
pub use domain::schema::{IndexField, Schema};
pub use domain::transaction::{
    Receipt, ReceiptItem, Transaction, TransactionId, TransactionKind, TransactionPatch,
    TransactionType,
};
pub use domain::validation::{TransactionCandidate, validate};
pub use error::{Result, StoreError};
