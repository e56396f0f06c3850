//! Record and collection types.
//!
//! A record is a business entity instance: a collection name, an identity,
//! and an opaque field map. The core has no knowledge of what the fields
//! contain — that is entirely screen-defined. Writes replace the whole field
//! map (last-write-wins, no field merge).

use crate::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The opaque field map carried by every record and mutation payload.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// Name of an entity collection ("leads", "appointments", ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection(String);

impl Collection {
    /// Wraps a collection name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the collection name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Collection {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Collection {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A business entity instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// The collection this record belongs to.
    pub collection: Collection,

    /// Temporary until the first successful insert replay, permanent after.
    pub id: RecordId,

    /// Opaque field map, replaced wholesale on every write.
    pub fields: FieldMap,
}

impl Record {
    /// Creates a record.
    #[must_use]
    pub fn new(collection: Collection, id: impl Into<RecordId>, fields: FieldMap) -> Self {
        Self {
            collection,
            id: id.into(),
            fields,
        }
    }

    /// Returns a string field, if present and a string.
    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(|v| v.as_str())
    }
}
