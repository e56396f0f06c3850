//! Queued mutation operations.
//!
//! Every local mutation becomes a [`QueueOp`] — the unit of replay against
//! the remote record store. Operations are totally ordered by their enqueue
//! sequence number; an operation tagged with an unresolved dependency never
//! replays before that dependency resolves.

use crate::{Collection, FieldMap, RecordId, TempId};
use serde::{Deserialize, Serialize};

/// The kind of remote effect a queued operation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpVerb {
    /// Create the record remotely; promotes a temp id on success.
    Insert,
    /// Replace the remote record's fields.
    Modify,
    /// Delete the remote record.
    Remove,
}

/// Marks that an operation must wait until a referenced temporary id is
/// remapped to a permanent one, and names the payload field to rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyTag {
    /// The payload field holding the parent reference (e.g. `lead_id`).
    pub field: String,
    /// The parent's temporary id, resolved via the remap table.
    pub parent: TempId,
}

/// One pending create/modify/remove, durably queued for replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueOp {
    /// Enqueue position; total FIFO order.
    pub seq: u64,

    /// The collection the subject record belongs to.
    pub collection: Collection,

    /// What to do remotely.
    pub verb: OpVerb,

    /// The record this operation targets.
    pub subject: RecordId,

    /// Full field map for insert/modify; empty for remove.
    pub payload: FieldMap,

    /// Present when the payload references a not-yet-synced parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<DependencyTag>,
}

impl QueueOp {
    /// Creates an insert operation for a record created offline.
    #[must_use]
    pub fn insert(seq: u64, collection: Collection, subject: TempId, payload: FieldMap) -> Self {
        Self {
            seq,
            collection,
            verb: OpVerb::Insert,
            subject: RecordId::Temp(subject),
            payload,
            dependency: None,
        }
    }

    /// Creates a modify operation.
    #[must_use]
    pub fn modify(seq: u64, collection: Collection, subject: RecordId, payload: FieldMap) -> Self {
        Self {
            seq,
            collection,
            verb: OpVerb::Modify,
            subject,
            payload,
            dependency: None,
        }
    }

    /// Creates a remove operation.
    #[must_use]
    pub fn remove(seq: u64, collection: Collection, subject: RecordId) -> Self {
        Self {
            seq,
            collection,
            verb: OpVerb::Remove,
            subject,
            payload: FieldMap::new(),
            dependency: None,
        }
    }

    /// Tags this operation as depending on a not-yet-synced parent.
    #[must_use]
    pub fn with_dependency(mut self, field: impl Into<String>, parent: TempId) -> Self {
        self.dependency = Some(DependencyTag {
            field: field.into(),
            parent,
        });
        self
    }

    /// Whether this operation targets the given temp id.
    #[must_use]
    pub fn targets_temp(&self, temp: TempId) -> bool {
        self.subject == RecordId::Temp(temp)
    }
}
