//! Note records as the search core sees them.

use attributes::PackedAttributes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One note as returned by the remote node store.
///
/// The body text never reaches the search core; only the packed fingerprint
/// attributes and the timestamps do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Absent for notes that were never indexed.
    #[serde(default)]
    pub packed_attributes: Option<PackedAttributes>,
}

impl NodeRecord {
    pub fn new(
        id: impl Into<String>,
        created_at: DateTime<Utc>,
        packed_attributes: Option<PackedAttributes>,
    ) -> Self {
        Self {
            id: id.into(),
            created_at,
            updated_at: created_at,
            packed_attributes,
        }
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }
}
