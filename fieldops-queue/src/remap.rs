//! Temp-to-permanent identifier remap table.

use fieldops_types::{RecordId, RemoteId, TempId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maps temporary ids to the permanent ids the remote store assigned them.
///
/// Populated on every successful insert replay; consulted by the resolver
/// when deciding replay eligibility and by the projector when rendering
/// references.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemapTable {
    entries: HashMap<TempId, RemoteId>,
}

impl RemapTable {
    /// Creates an empty remap table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a promotion. A temp id is promoted exactly once; a repeat
    /// insert for the same temp id keeps the first mapping.
    pub fn record(&mut self, temp: TempId, remote: RemoteId) {
        self.entries.entry(temp).or_insert(remote);
    }

    /// Looks up the permanent id for a temp id, if promoted.
    #[must_use]
    pub fn resolve(&self, temp: TempId) -> Option<&RemoteId> {
        self.entries.get(&temp)
    }

    /// Resolves a record id to its permanent form where known.
    #[must_use]
    pub fn resolve_id(&self, id: &RecordId) -> RecordId {
        match id {
            RecordId::Temp(t) => match self.entries.get(t) {
                Some(remote) => RecordId::Remote(remote.clone()),
                None => id.clone(),
            },
            RecordId::Remote(_) => id.clone(),
        }
    }

    /// Whether the table holds a mapping for the given temp id.
    #[must_use]
    pub fn contains(&self, temp: TempId) -> bool {
        self.entries.contains_key(&temp)
    }

    /// Number of promotions recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no promotions have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
