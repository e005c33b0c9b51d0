//! Validity rules for transactions, and conversion of loosely typed input
//! into the typed model.
//!
//! UI collaborators hand over plain numbers and a string discriminant, so
//! [`TransactionCandidate`] mirrors that shape. Converting it into a
//! [`Transaction`] checks every field and reports all failures together.

use crate::domain::transaction::{Receipt, ReceiptItem, Transaction, TransactionKind};
use crate::error::{FieldIssue, ValidationError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};

/// Checks a typed transaction against the model's invariants.
///
/// Pure function of its input. Every failing field is reported.
pub fn validate(candidate: &Transaction) -> Result<(), ValidationError> {
    let mut issues = Vec::new();

    if DateTime::<Utc>::from_timestamp_millis(candidate.date).is_none() {
        issues.push(FieldIssue::new("date", "is not a valid timestamp"));
    }

    if let TransactionKind::Expense {
        receipt: Some(receipt),
    } = &candidate.kind
    {
        for (index, item) in receipt.items.iter().enumerate() {
            if item.quantity <= Decimal::ZERO {
                issues.push(FieldIssue::new(
                    format!("receipt.items[{index}].quantity"),
                    "must be positive",
                ));
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(issues))
    }
}

/// Untyped transaction data as produced by a form or a JSON payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionCandidate {
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: f64,
    #[serde(default)]
    pub description: String,
    pub date: f64,
    #[serde(default)]
    pub receipt: Option<ReceiptCandidate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiptCandidate {
    #[serde(default)]
    pub seller: String,
    pub tax: f64,
    pub amount: f64,
    #[serde(default)]
    pub items: Vec<ReceiptItemCandidate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItemCandidate {
    #[serde(default)]
    pub description: String,
    pub quantity: f64,
    pub amount: f64,
}

impl TransactionCandidate {
    /// Parses a JSON payload. Malformed input is reported against field `$`.
    pub fn from_json(payload: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(payload).map_err(|e| ValidationError::single("$", e.to_string()))
    }
}

impl TryFrom<TransactionCandidate> for Transaction {
    type Error = ValidationError;

    fn try_from(candidate: TransactionCandidate) -> Result<Self, Self::Error> {
        let mut issues = Vec::new();

        let amount = decimal_field(candidate.amount, "amount", &mut issues);
        let date = timestamp_field(candidate.date, &mut issues);
        let receipt = candidate
            .receipt
            .map(|receipt| receipt_field(receipt, &mut issues));

        let kind = match candidate.kind.as_str() {
            "income" => {
                if receipt.is_some() {
                    issues.push(FieldIssue::new("receipt", "only expenses carry a receipt"));
                }
                Some(TransactionKind::Income)
            }
            "expense" => Some(TransactionKind::Expense { receipt }),
            other => {
                issues.push(FieldIssue::new(
                    "type",
                    format!("expected `income` or `expense`, got `{other}`"),
                ));
                None
            }
        };

        let (Some(amount), Some(date), Some(kind), true) = (amount, date, kind, issues.is_empty())
        else {
            return Err(ValidationError::new(issues));
        };

        let tx = Transaction {
            id: None,
            amount,
            description: candidate.description,
            date,
            kind,
        };
        validate(&tx)?;
        Ok(tx)
    }
}

fn receipt_field(candidate: ReceiptCandidate, issues: &mut Vec<FieldIssue>) -> Receipt {
    let tax = decimal_field(candidate.tax, "receipt.tax", issues);
    let amount = decimal_field(candidate.amount, "receipt.amount", issues);
    let items = candidate
        .items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let quantity = decimal_field(
                item.quantity,
                &format!("receipt.items[{index}].quantity"),
                issues,
            );
            if let Some(quantity) = quantity
                && quantity <= Decimal::ZERO
            {
                issues.push(FieldIssue::new(
                    format!("receipt.items[{index}].quantity"),
                    "must be positive",
                ));
            }
            let amount = decimal_field(
                item.amount,
                &format!("receipt.items[{index}].amount"),
                issues,
            );
            ReceiptItem::new(
                item.description,
                quantity.unwrap_or_default(),
                amount.unwrap_or_default(),
            )
        })
        .collect();

    // Placeholders only survive when an issue was recorded, which aborts the conversion.
    Receipt::new(
        candidate.seller,
        tax.unwrap_or_default(),
        amount.unwrap_or_default(),
        items,
    )
}

fn decimal_field(value: f64, field: &str, issues: &mut Vec<FieldIssue>) -> Option<Decimal> {
    if !value.is_finite() {
        issues.push(FieldIssue::new(field, "must be a finite number"));
        return None;
    }
    let decimal = Decimal::from_f64(value);
    if decimal.is_none() {
        issues.push(FieldIssue::new(field, "is out of the supported decimal range"));
    }
    decimal
}

fn timestamp_field(value: f64, issues: &mut Vec<FieldIssue>) -> Option<i64> {
    if !value.is_finite() || value.fract() != 0.0 {
        issues.push(FieldIssue::new("date", "must be whole epoch milliseconds"));
        return None;
    }
    if value < i64::MIN as f64 || value > i64::MAX as f64 {
        issues.push(FieldIssue::new("date", "is not a valid timestamp"));
        return None;
    }
    let millis = value as i64;
    if DateTime::<Utc>::from_timestamp_millis(millis).is_none() {
        issues.push(FieldIssue::new("date", "is not a valid timestamp"));
        return None;
    }
    Some(millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::TransactionType;
    use rust_decimal_macros::dec;

    fn expense_candidate(quantities: &[f64]) -> TransactionCandidate {
        TransactionCandidate {
            kind: "expense".to_string(),
            amount: 10.0,
            description: "market".to_string(),
            date: 1_700_000_000_000.0,
            receipt: Some(ReceiptCandidate {
                seller: "Market".to_string(),
                tax: 0.5,
                amount: 10.0,
                items: quantities
                    .iter()
                    .map(|&quantity| ReceiptItemCandidate {
                        description: "apple".to_string(),
                        quantity,
                        amount: 1.25,
                    })
                    .collect(),
            }),
        }
    }

    #[test]
    fn test_valid_expense_candidate() {
        let tx = Transaction::try_from(expense_candidate(&[1.0, 3.0])).unwrap();

        assert_eq!(tx.transaction_type(), TransactionType::Expense);
        assert_eq!(tx.amount, dec!(10));
        let receipt = tx.receipt().unwrap();
        assert_eq!(receipt.items.len(), 2);
        assert_eq!(receipt.items[1].quantity, dec!(3));
        assert_eq!(receipt.tax, dec!(0.5));
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let err = Transaction::try_from(expense_candidate(&[1.0, -1.0])).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert!(err.has_field("receipt.items[1].quantity"));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let err = Transaction::try_from(expense_candidate(&[0.0])).unwrap_err();
        assert!(err.has_field("receipt.items[0].quantity"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let mut candidate = expense_candidate(&[]);
        candidate.kind = "transfer".to_string();

        let err = Transaction::try_from(candidate).unwrap_err();
        assert!(err.has_field("type"));
    }

    #[test]
    fn test_non_finite_amount_and_bad_date_reported_together() {
        let candidate = TransactionCandidate {
            kind: "income".to_string(),
            amount: f64::NAN,
            description: String::new(),
            date: 1.5,
            receipt: None,
        };

        let err = Transaction::try_from(candidate).unwrap_err();
        assert!(err.has_field("amount"));
        assert!(err.has_field("date"));
    }

    #[test]
    fn test_out_of_range_amount_rejected() {
        let mut candidate = expense_candidate(&[]);
        candidate.amount = 1e30;

        let err = Transaction::try_from(candidate).unwrap_err();
        assert!(err.has_field("amount"));
    }

    #[test]
    fn test_receipt_on_income_rejected() {
        let mut candidate = expense_candidate(&[1.0]);
        candidate.kind = "income".to_string();

        let err = Transaction::try_from(candidate).unwrap_err();
        assert!(err.has_field("receipt"));
    }

    #[test]
    fn test_timestamp_out_of_chrono_range() {
        let tx = Transaction::income(dec!(1), "", i64::MAX);
        let err = validate(&tx).unwrap_err();
        assert!(err.has_field("date"));
    }

    #[test]
    fn test_past_and_future_dates_accepted() {
        assert!(validate(&Transaction::income(dec!(1), "", -86_400_000)).is_ok());
        assert!(validate(&Transaction::income(dec!(1), "", 4_102_444_800_000)).is_ok());
    }

    #[test]
    fn test_from_json_payload() {
        let candidate = TransactionCandidate::from_json(
            r#"{"type":"income","amount":1000,"description":"salary","date":86400000}"#,
        )
        .unwrap();
        let tx = Transaction::try_from(candidate).unwrap();
        assert_eq!(tx.amount, dec!(1000));

        let err = TransactionCandidate::from_json("{not json").unwrap_err();
        assert!(err.has_field("$"));
    }
}
