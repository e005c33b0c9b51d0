use crate::domain::ports::StoreMeta;
use crate::error::MigrationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A transaction field that can carry a secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexField {
    Type,
    Amount,
    Description,
    Date,
    /// Existence index: only records carrying a receipt are indexed.
    Receipt,
}

impl IndexField {
    pub const ALL: [IndexField; 5] = [
        IndexField::Type,
        IndexField::Amount,
        IndexField::Description,
        IndexField::Date,
        IndexField::Receipt,
    ];
}

impl fmt::Display for IndexField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Type => "type",
            Self::Amount => "amount",
            Self::Description => "description",
            Self::Date => "date",
            Self::Receipt => "receipt",
        };
        f.write_str(name)
    }
}

/// The layout a store is opened with: a version and the indexed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub version: u32,
    pub indexes: BTreeSet<IndexField>,
}

/// What opening a store against persisted metadata has to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationPlan {
    /// Nothing persisted yet.
    Initialize,
    UpToDate,
    /// Additive upgrade; `added` indexes are built from existing records.
    Upgrade { from: u32, added: Vec<IndexField> },
}

impl Schema {
    pub fn new(version: u32, indexes: impl IntoIterator<Item = IndexField>) -> Self {
        Self {
            version,
            indexes: indexes.into_iter().collect(),
        }
    }

    /// Version 1: every field indexed.
    pub fn v1() -> Self {
        Self::new(1, IndexField::ALL)
    }

    pub fn is_indexed(&self, field: IndexField) -> bool {
        self.indexes.contains(&field)
    }

    /// Decides how to reconcile this schema with what is persisted.
    ///
    /// Only additive upgrades are accepted: a higher version may add
    /// indexes but never drop one, and a lower version is rejected.
    pub fn plan(&self, persisted: Option<&StoreMeta>) -> Result<MigrationPlan, MigrationError> {
        if self.version == 0 {
            return Err(MigrationError::InvalidSchema(
                "schema versions start at 1".to_string(),
            ));
        }

        let Some(meta) = persisted else {
            return Ok(MigrationPlan::Initialize);
        };
        let on_disk: BTreeSet<IndexField> = meta.indexes.iter().copied().collect();

        if self.version < meta.schema_version {
            return Err(MigrationError::Downgrade {
                persisted: meta.schema_version,
                declared: self.version,
            });
        }

        if self.version == meta.schema_version {
            return if on_disk == self.indexes {
                Ok(MigrationPlan::UpToDate)
            } else {
                Err(MigrationError::IndexMismatch {
                    version: self.version,
                })
            };
        }

        let removed: Vec<IndexField> = on_disk.difference(&self.indexes).copied().collect();
        if !removed.is_empty() {
            return Err(MigrationError::NotAdditive {
                persisted: meta.schema_version,
                declared: self.version,
                removed,
            });
        }

        Ok(MigrationPlan::Upgrade {
            from: meta.schema_version,
            added: self.indexes.difference(&on_disk).copied().collect(),
        })
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::v1()
    }
}
