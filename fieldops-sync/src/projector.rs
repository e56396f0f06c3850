//! Optimistic state projector.
//!
//! The in-memory per-collection view every screen reads. Updated before
//! the corresponding cache/queue persistence on local mutation, so a read
//! immediately after a mutation observes it; replaced wholesale on network
//! refresh; rekeyed when a temp id is promoted.

use fieldops_types::{Collection, Record, RecordId, RemoteId, TempId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory projection of every hydrated collection.
#[derive(Debug, Clone, Default)]
pub struct Projector {
    collections: Arc<RwLock<HashMap<Collection, Vec<Record>>>>,
}

impl Projector {
    /// Creates an empty projector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current view of a collection, in stored order.
    pub async fn snapshot(&self, collection: &Collection) -> Vec<Record> {
        self.collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether a collection has never been hydrated or mutated.
    pub async fn is_empty(&self, collection: &Collection) -> bool {
        !self.collections.read().await.contains_key(collection)
    }

    /// Upserts one record, preserving position for existing ids.
    pub async fn upsert(&self, record: Record) {
        let mut collections = self.collections.write().await;
        let records = collections.entry(record.collection.clone()).or_default();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    /// Removes one record; no-op if absent.
    pub async fn remove(&self, collection: &Collection, id: &RecordId) {
        if let Some(records) = self.collections.write().await.get_mut(collection) {
            records.retain(|r| &r.id != id);
        }
    }

    /// Replaces a collection's view wholesale (network refresh, hydration).
    pub async fn replace(&self, collection: Collection, records: Vec<Record>) {
        self.collections.write().await.insert(collection, records);
    }

    /// Rewrites a promoted temp id everywhere it appears: record ids and
    /// string fields referencing it from other records.
    pub async fn rekey(&self, temp: TempId, remote: &RemoteId) {
        let temp_str = temp.to_string();
        let mut collections = self.collections.write().await;
        for records in collections.values_mut() {
            for record in records.iter_mut() {
                if record.id == RecordId::Temp(temp) {
                    record.id = RecordId::Remote(remote.clone());
                }
                for value in record.fields.values_mut() {
                    if value.as_str() == Some(temp_str.as_str()) {
                        *value = serde_json::Value::String(remote.to_string());
                    }
                }
            }
        }
    }

    /// Drops every collection view. Session teardown only.
    pub async fn clear(&self) {
        self.collections.write().await.clear();
    }
}
