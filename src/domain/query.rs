use crate::domain::transaction::{Transaction, TransactionType};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::ops::RangeInclusive;

/// How to match `description`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptionMatch {
    Exact(String),
    Prefix(String),
}

impl DescriptionMatch {
    pub fn matches(&self, description: &str) -> bool {
        match self {
            Self::Exact(expected) => description == expected,
            Self::Prefix(prefix) => description.starts_with(prefix.as_str()),
        }
    }
}

/// Conjunction of predicates over indexed transaction fields.
///
/// An empty filter matches every transaction. Ranges are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub kind: Option<TransactionType>,
    pub date: Option<RangeInclusive<i64>>,
    pub amount: Option<RangeInclusive<Decimal>>,
    pub description: Option<DescriptionMatch>,
    pub has_receipt: Option<bool>,
}

impl TransactionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: TransactionType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn date_between(mut self, from: i64, to: i64) -> Self {
        self.date = Some(from..=to);
        self
    }

    pub fn since(self, from: i64) -> Self {
        self.date_between(from, i64::MAX)
    }

    pub fn until(self, to: i64) -> Self {
        self.date_between(i64::MIN, to)
    }

    pub fn amount_between(mut self, min: Decimal, max: Decimal) -> Self {
        self.amount = Some(min..=max);
        self
    }

    pub fn description_is(mut self, description: impl Into<String>) -> Self {
        self.description = Some(DescriptionMatch::Exact(description.into()));
        self
    }

    pub fn description_starts_with(mut self, prefix: impl Into<String>) -> Self {
        self.description = Some(DescriptionMatch::Prefix(prefix.into()));
        self
    }

    pub fn has_receipt(mut self, present: bool) -> Self {
        self.has_receipt = Some(present);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.date.is_none()
            && self.amount.is_none()
            && self.description.is_none()
            && self.has_receipt.is_none()
    }

    /// Evaluates every predicate directly against a record.
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.kind.is_none_or(|kind| tx.transaction_type() == kind)
            && self.date.as_ref().is_none_or(|range| range.contains(&tx.date))
            && self
                .amount
                .as_ref()
                .is_none_or(|range| range.contains(&tx.amount))
            && self
                .description
                .as_ref()
                .is_none_or(|m| m.matches(&tx.description))
            && self
                .has_receipt
                .is_none_or(|present| tx.has_receipt() == present)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderBy {
    #[default]
    Date,
    Amount,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Result ordering. Ties on the ordering key fall back to insertion order,
/// and `Descending` is the exact reverse of `Ascending`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOrder {
    pub by: OrderBy,
    pub direction: SortOrder,
}

impl QueryOrder {
    pub fn date_ascending() -> Self {
        Self::default()
    }

    pub fn date_descending() -> Self {
        Self {
            by: OrderBy::Date,
            direction: SortOrder::Descending,
        }
    }

    pub fn amount_ascending() -> Self {
        Self {
            by: OrderBy::Amount,
            direction: SortOrder::Ascending,
        }
    }

    pub fn amount_descending() -> Self {
        Self {
            by: OrderBy::Amount,
            direction: SortOrder::Descending,
        }
    }

    /// Compares two persisted records. Records without an id sort first.
    pub fn compare(&self, a: &Transaction, b: &Transaction) -> Ordering {
        let ordering = match self.by {
            OrderBy::Date => a.date.cmp(&b.date),
            OrderBy::Amount => a.amount.cmp(&b.amount),
        }
        .then_with(|| a.id.cmp(&b.id));

        match self.direction {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}
