use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identifier assigned by the store on first persistence. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub u64);

impl TransactionId {
    pub const MIN: Self = Self(u64::MIN);
    pub const MAX: Self = Self(u64::MAX);

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TransactionId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// The discriminant of a transaction, without any variant payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single line of a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    #[serde(default)]
    pub description: String,
    pub quantity: Decimal,
    pub amount: Decimal,
}

impl ReceiptItem {
    pub fn new(description: impl Into<String>, quantity: Decimal, amount: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity,
            amount,
        }
    }
}

/// Itemized breakdown of an expense.
///
/// `amount` and `tax` are stored as declared; they are not reconciled
/// against the line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    #[serde(default)]
    pub seller: String,
    pub tax: Decimal,
    pub amount: Decimal,
    #[serde(default)]
    pub items: Vec<ReceiptItem>,
}

impl Receipt {
    pub fn new(
        seller: impl Into<String>,
        tax: Decimal,
        amount: Decimal,
        items: Vec<ReceiptItem>,
    ) -> Self {
        Self {
            seller: seller.into(),
            tax,
            amount,
            items,
        }
    }
}

/// Variant payload of a transaction, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        receipt: Option<Receipt>,
    },
}

#[derive(Deserialize)]
struct KindRepr {
    #[serde(rename = "type")]
    kind: TransactionType,
    #[serde(default)]
    receipt: Option<Receipt>,
}

// Decoded by hand so that a receipt next to `"type": "income"` is an error
// instead of being dropped.
impl<'de> Deserialize<'de> for TransactionKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = KindRepr::deserialize(deserializer)?;
        match (repr.kind, repr.receipt) {
            (TransactionType::Income, Some(_)) => {
                Err(D::Error::custom("an income transaction cannot carry a receipt"))
            }
            (TransactionType::Income, None) => Ok(Self::Income),
            (TransactionType::Expense, receipt) => Ok(Self::Expense { receipt }),
        }
    }
}

impl TransactionKind {
    pub fn transaction_type(&self) -> TransactionType {
        match self {
            Self::Income => TransactionType::Income,
            Self::Expense { .. } => TransactionType::Expense,
        }
    }
}

/// A recorded monetary event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TransactionId>,
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
    /// Epoch milliseconds.
    pub date: i64,
    #[serde(flatten)]
    pub kind: TransactionKind,
}

impl Transaction {
    pub fn income(amount: Decimal, description: impl Into<String>, date: i64) -> Self {
        Self {
            id: None,
            amount,
            description: description.into(),
            date,
            kind: TransactionKind::Income,
        }
    }

    pub fn expense(
        amount: Decimal,
        description: impl Into<String>,
        date: i64,
        receipt: Option<Receipt>,
    ) -> Self {
        Self {
            id: None,
            amount,
            description: description.into(),
            date,
            kind: TransactionKind::Expense { receipt },
        }
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.kind.transaction_type()
    }

    pub fn receipt(&self) -> Option<&Receipt> {
        match &self.kind {
            TransactionKind::Income => None,
            TransactionKind::Expense { receipt } => receipt.as_ref(),
        }
    }

    pub fn has_receipt(&self) -> bool {
        self.receipt().is_some()
    }

    /// The `date` as a UTC instant, or `None` if it is out of range.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.date)
    }

    pub fn with_id(mut self, id: TransactionId) -> Self {
        self.id = Some(id);
        self
    }
}

/// Fields to merge into an existing record. Absent fields are kept.
///
/// `receipt` is tri-state: `None` keeps the current receipt, `Some(None)`
/// clears it and `Some(Some(_))` replaces it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionPatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<i64>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub receipt: Option<Option<Receipt>>,
}

impl TransactionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON edit payload. Malformed input is reported against
    /// field `$`.
    pub fn from_json(payload: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(payload).map_err(|e| ValidationError::single("$", e.to_string()))
    }

    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn date(mut self, date: i64) -> Self {
        self.date = Some(date);
        self
    }

    pub fn receipt(mut self, receipt: Option<Receipt>) -> Self {
        self.receipt = Some(receipt);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.amount.is_none()
            && self.description.is_none()
            && self.date.is_none()
            && self.receipt.is_none()
    }
}

impl From<Transaction> for TransactionPatch {
    fn from(tx: Transaction) -> Self {
        let kind = tx.transaction_type();
        let receipt = match tx.kind {
            TransactionKind::Income => None,
            TransactionKind::Expense { receipt } => Some(receipt),
        };
        Self {
            kind: Some(kind),
            amount: Some(tx.amount),
            description: Some(tx.description),
            date: Some(tx.date),
            receipt,
        }
    }
}

// A present key, even when `null`, means "set"; a missing key falls back to
// the field default and means "keep".
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
