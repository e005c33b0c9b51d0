use crate::domain::query::{DescriptionMatch, TransactionFilter};
use crate::domain::schema::IndexField;
use crate::domain::transaction::{Transaction, TransactionId, TransactionType};
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};

/// Secondary indexes over the fields a schema declares.
///
/// Range indexes are ordered sets of `(key, id)` pairs so equal keys keep
/// id order. Fields that are not declared are never populated.
#[derive(Debug, Default)]
pub struct IndexSet {
    fields: BTreeSet<IndexField>,
    by_type: HashMap<TransactionType, BTreeSet<TransactionId>>,
    by_amount: BTreeSet<(Decimal, TransactionId)>,
    by_description: BTreeSet<(String, TransactionId)>,
    by_date: BTreeSet<(i64, TransactionId)>,
    with_receipt: BTreeSet<TransactionId>,
}

impl IndexSet {
    pub fn new(fields: impl IntoIterator<Item = IndexField>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn is_indexed(&self, field: IndexField) -> bool {
        self.fields.contains(&field)
    }

    /// Adds a persisted record. Records without an id are ignored.
    pub fn insert(&mut self, tx: &Transaction) {
        let Some(id) = tx.id else {
            return;
        };
        if self.is_indexed(IndexField::Type) {
            self.by_type
                .entry(tx.transaction_type())
                .or_default()
                .insert(id);
        }
        if self.is_indexed(IndexField::Amount) {
            self.by_amount.insert((tx.amount, id));
        }
        if self.is_indexed(IndexField::Description) {
            self.by_description.insert((tx.description.clone(), id));
        }
        if self.is_indexed(IndexField::Date) {
            self.by_date.insert((tx.date, id));
        }
        if self.is_indexed(IndexField::Receipt) && tx.has_receipt() {
            self.with_receipt.insert(id);
        }
    }

    /// Removes the entries `tx` contributed. `tx` must be the indexed version.
    pub fn remove(&mut self, tx: &Transaction) {
        let Some(id) = tx.id else {
            return;
        };
        if let Some(ids) = self.by_type.get_mut(&tx.transaction_type()) {
            ids.remove(&id);
        }
        self.by_amount.remove(&(tx.amount, id));
        self.by_description.remove(&(tx.description.clone(), id));
        self.by_date.remove(&(tx.date, id));
        self.with_receipt.remove(&id);
    }

    /// Ids satisfying every indexed predicate of `filter`.
    ///
    /// Returns `None` when no predicate can be answered from an index, in
    /// which case the caller has to scan. Predicates on fields without an
    /// index are not applied here.
    pub fn lookup(&self, filter: &TransactionFilter) -> Option<BTreeSet<TransactionId>> {
        let mut hits: Vec<BTreeSet<TransactionId>> = Vec::new();

        if let Some(kind) = filter.kind
            && self.is_indexed(IndexField::Type)
        {
            hits.push(self.by_type.get(&kind).cloned().unwrap_or_default());
        }

        if let Some(range) = &filter.date
            && self.is_indexed(IndexField::Date)
        {
            let (from, to) = (*range.start(), *range.end());
            hits.push(if from > to {
                BTreeSet::new()
            } else {
                self.by_date
                    .range((from, TransactionId::MIN)..=(to, TransactionId::MAX))
                    .map(|(_, id)| *id)
                    .collect()
            });
        }

        if let Some(range) = &filter.amount
            && self.is_indexed(IndexField::Amount)
        {
            let (min, max) = (*range.start(), *range.end());
            hits.push(if min > max {
                BTreeSet::new()
            } else {
                self.by_amount
                    .range((min, TransactionId::MIN)..=(max, TransactionId::MAX))
                    .map(|(_, id)| *id)
                    .collect()
            });
        }

        if let Some(description) = &filter.description
            && self.is_indexed(IndexField::Description)
        {
            hits.push(self.description_lookup(description));
        }

        // The existence index can only answer "has a receipt".
        if filter.has_receipt == Some(true) && self.is_indexed(IndexField::Receipt) {
            hits.push(self.with_receipt.clone());
        }

        intersect(hits)
    }

    fn description_lookup(&self, description: &DescriptionMatch) -> BTreeSet<TransactionId> {
        match description {
            DescriptionMatch::Exact(text) => self
                .by_description
                .range((text.clone(), TransactionId::MIN)..=(text.clone(), TransactionId::MAX))
                .map(|(_, id)| *id)
                .collect(),
            DescriptionMatch::Prefix(prefix) => self
                .by_description
                .range((prefix.clone(), TransactionId::MIN)..)
                .take_while(|(text, _)| text.starts_with(prefix.as_str()))
                .map(|(_, id)| *id)
                .collect(),
        }
    }
}

fn intersect(mut sets: Vec<BTreeSet<TransactionId>>) -> Option<BTreeSet<TransactionId>> {
    sets.sort_by_key(BTreeSet::len);
    let mut sets = sets.into_iter();
    let mut result = sets.next()?;
    for set in sets {
        if result.is_empty() {
            break;
        }
        result.retain(|id| set.contains(id));
    }
    Some(result)
}
