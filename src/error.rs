use crate::domain::schema::IndexField;
use crate::domain::transaction::TransactionId;
use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Every failure a store operation can report.
#[derive(Error, Diagnostic, Debug)]
pub enum StoreError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error("transaction {0} not found")]
    #[diagnostic(code(money_log::not_found))]
    NotFound(TransactionId),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Migration(#[from] MigrationError),

    #[error("invalid configuration: {0}")]
    #[diagnostic(code(money_log::config))]
    Config(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// A single field that failed validation, addressed by a dotted path
/// such as `receipt.items[0].quantity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Input violated the transaction model. Carries every failing field.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
#[error("invalid transaction: {}", join_issues(.issues))]
#[diagnostic(
    code(money_log::validation),
    help("fix the listed fields and submit the transaction again")
)]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<FieldIssue>) -> Self {
        Self { issues }
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![FieldIssue::new(field, message)])
    }

    /// Returns `true` if any issue was reported for `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// Transient I/O failure of the substrate.
    Io,
    /// The substrate ran out of space or quota.
    QuotaExceeded,
    /// Persisted data could not be decoded or violates store invariants.
    Corrupted,
    /// Failure inside the store itself (task panicked, id space exhausted).
    Internal,
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Io => "I/O error",
            Self::QuotaExceeded => "quota exceeded",
            Self::Corrupted => "corrupted data",
            Self::Internal => "internal error",
        };
        f.write_str(name)
    }
}

/// The persistence substrate failed. Never retried by the store.
#[derive(Error, Diagnostic, Debug)]
#[error("storage {kind}: {message}")]
#[diagnostic(code(money_log::storage))]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StorageError {
    pub fn new(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: StorageErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Corrupted, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Internal, message)
    }

    /// Whether a caller may reasonably retry the failed operation.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind,
            StorageErrorKind::Io | StorageErrorKind::QuotaExceeded
        )
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::StorageFull | std::io::ErrorKind::QuotaExceeded => {
                StorageErrorKind::QuotaExceeded
            }
            std::io::ErrorKind::InvalidData => StorageErrorKind::Corrupted,
            _ => StorageErrorKind::Io,
        };
        Self::with_source(kind, err.to_string(), err)
    }
}

/// The declared schema cannot be reconciled with the persisted one.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum MigrationError {
    #[error("schema version {declared} is older than the persisted version {persisted}")]
    #[diagnostic(
        code(money_log::migration::downgrade),
        help("open the store with a schema version of at least {persisted}")
    )]
    Downgrade { persisted: u32, declared: u32 },

    #[error("schema version {declared} drops indexes {removed:?} present in version {persisted}")]
    #[diagnostic(
        code(money_log::migration::not_additive),
        help("migrations may only add indexes")
    )]
    NotAdditive {
        persisted: u32,
        declared: u32,
        removed: Vec<IndexField>,
    },

    #[error("schema version {version} is persisted with a different index set")]
    #[diagnostic(
        code(money_log::migration::index_mismatch),
        help("bump the schema version to change the declared indexes")
    )]
    IndexMismatch { version: u32 },

    #[error("invalid schema: {0}")]
    #[diagnostic(code(money_log::migration::invalid_schema))]
    InvalidSchema(String),
}
