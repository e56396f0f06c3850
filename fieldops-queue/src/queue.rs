//! Mutation queue implementation.

use crate::RemapTable;
use fieldops_cache::SnapshotCache;
use fieldops_types::{Collection, FieldMap, OpVerb, QueueOp, RecordId, RemoteId, TempId};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Reserved cache snapshot name for queue persistence. Collection names
/// starting with `__` are reserved for internal snapshots.
pub const QUEUE_SNAPSHOT: &str = "__mutation_queue";

/// Durable FIFO queue of pending mutations for one session.
pub struct MutationQueue {
    cache: Arc<SnapshotCache>,
    inner: Arc<RwLock<QueueInner>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct QueueInner {
    next_seq: u64,
    ops: VecDeque<QueueOp>,
}

impl MutationQueue {
    /// Loads the queue from its cache snapshot, empty if none exists.
    pub async fn load(cache: Arc<SnapshotCache>) -> Self {
        let inner: QueueInner = cache.get_blob(QUEUE_SNAPSHOT).await.unwrap_or_default();
        if !inner.ops.is_empty() {
            debug!("Reloaded {} pending operations", inner.ops.len());
        }
        Self {
            cache,
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    /// Appends an insert for a record created offline. Returns the enqueue
    /// position once the operation is stored.
    pub async fn enqueue_insert(
        &self,
        collection: Collection,
        subject: TempId,
        payload: FieldMap,
        dependency: Option<(String, TempId)>,
    ) -> u64 {
        let mut inner = self.inner.write().await;
        let seq = inner.take_seq();
        let mut op = QueueOp::insert(seq, collection, subject, payload);
        if let Some((field, parent)) = dependency {
            op = op.with_dependency(field, parent);
        }
        inner.ops.push_back(op);
        self.persist(&inner).await;
        seq
    }

    /// Appends a modify. The payload is the record's full field map.
    pub async fn enqueue_modify(
        &self,
        collection: Collection,
        subject: RecordId,
        payload: FieldMap,
        dependency: Option<(String, TempId)>,
    ) -> u64 {
        let mut inner = self.inner.write().await;
        let seq = inner.take_seq();
        let mut op = QueueOp::modify(seq, collection, subject, payload);
        if let Some((field, parent)) = dependency {
            op = op.with_dependency(field, parent);
        }
        inner.ops.push_back(op);
        self.persist(&inner).await;
        seq
    }

    /// Appends a remove for a record that exists remotely.
    ///
    /// Removal of a never-synced record must go through [`cancel_for`]
    /// instead; no remote call is ever made for an entity that never
    /// existed remotely.
    ///
    /// [`cancel_for`]: MutationQueue::cancel_for
    pub async fn enqueue_remove(&self, collection: Collection, subject: RecordId) -> u64 {
        let mut inner = self.inner.write().await;
        let seq = inner.take_seq();
        inner
            .ops
            .push_back(QueueOp::remove(seq, collection, subject));
        self.persist(&inner).await;
        seq
    }

    /// Returns the first operation eligible for replay, in FIFO order.
    ///
    /// An operation is withheld while its dependency tag names a parent the
    /// remap table has not resolved, or while it targets a temp id whose
    /// own insert is still queued ahead of it.
    pub async fn next_eligible(&self, remap: &RemapTable) -> Option<QueueOp> {
        let inner = self.inner.read().await;
        inner
            .ops
            .iter()
            .find(|op| is_eligible(op, remap))
            .cloned()
    }

    /// Removes an operation after its remote call completed. No-op if a
    /// concurrent drain pass already removed it.
    pub async fn complete(&self, seq: u64) {
        let mut inner = self.inner.write().await;
        let before = inner.ops.len();
        inner.ops.retain(|op| op.seq != seq);
        if inner.ops.len() == before {
            return;
        }
        self.persist(&inner).await;
    }

    /// Removes an operation that was terminally rejected, returning it so
    /// the caller can dead-letter it. `None` if already gone.
    pub async fn take(&self, seq: u64) -> Option<QueueOp> {
        let mut inner = self.inner.write().await;
        let pos = inner.ops.iter().position(|op| op.seq == seq)?;
        let op = inner.ops.remove(pos);
        self.persist(&inner).await;
        op
    }

    /// Collapses every pending operation for a never-synced record, and
    /// cascades to children whose pending inserts reference it. Returns the
    /// removed operations, oldest first.
    ///
    /// This is the local-removal edge case: a record created and removed
    /// offline before any replay produces zero remote calls.
    pub async fn cancel_for(&self, temp: TempId) -> Vec<QueueOp> {
        let mut inner = self.inner.write().await;

        let mut cancelled_temps = vec![temp];
        let mut removed = Vec::new();
        // A cancelled parent invalidates children still waiting on it;
        // their inserts can never resolve, so they collapse too.
        let mut i = 0;
        while i < cancelled_temps.len() {
            let current = cancelled_temps[i];
            let mut kept = VecDeque::with_capacity(inner.ops.len());
            for op in inner.ops.drain(..) {
                let depends_on_current = op
                    .dependency
                    .as_ref()
                    .is_some_and(|d| d.parent == current);
                if op.targets_temp(current) {
                    removed.push(op);
                } else if depends_on_current {
                    if let Some(t) = op.subject.as_temp() {
                        if !cancelled_temps.contains(&t) {
                            cancelled_temps.push(t);
                        }
                    }
                    removed.push(op);
                } else {
                    kept.push_back(op);
                }
            }
            inner.ops = kept;
            i += 1;
        }

        if !removed.is_empty() {
            debug!(
                "Collapsed {} pending operations for never-synced record {}",
                removed.len(),
                temp
            );
            self.persist(&inner).await;
        }
        removed.sort_by_key(|op| op.seq);
        removed
    }

    /// Rewrites a promoted temp id everywhere it still appears in the
    /// queue: operation subjects, and the foreign-key payload fields of
    /// dependent operations (which also clears their dependency tags).
    pub async fn rekey(&self, temp: TempId, remote: &RemoteId) {
        let temp_str = temp.to_string();
        let mut inner = self.inner.write().await;
        let mut touched = false;

        for op in inner.ops.iter_mut() {
            if op.targets_temp(temp) {
                op.subject = RecordId::Remote(remote.clone());
                touched = true;
            }
            for value in op.payload.values_mut() {
                if value.as_str() == Some(temp_str.as_str()) {
                    *value = serde_json::Value::String(remote.to_string());
                    touched = true;
                }
            }
            if op
                .dependency
                .as_ref()
                .is_some_and(|d| d.parent == temp)
            {
                op.dependency = None;
                touched = true;
            }
        }

        if touched {
            self.persist(&inner).await;
        }
    }

    /// Ids currently owned by the queue for one collection. Records with a
    /// pending operation belong to the queue, not to network refresh.
    pub async fn pending_ids(&self, collection: &Collection) -> HashSet<RecordId> {
        let inner = self.inner.read().await;
        inner
            .ops
            .iter()
            .filter(|op| &op.collection == collection)
            .map(|op| op.subject.clone())
            .collect()
    }

    /// Temp ids with an insert still pending. Used to detect foreign-key
    /// references to not-yet-synced parents.
    pub async fn pending_insert_temps(&self) -> HashSet<TempId> {
        let inner = self.inner.read().await;
        inner
            .ops
            .iter()
            .filter(|op| op.verb == OpVerb::Insert)
            .filter_map(|op| op.subject.as_temp())
            .collect()
    }

    /// Number of pending operations.
    pub async fn len(&self) -> usize {
        self.inner.read().await.ops.len()
    }

    /// Whether the queue is drained.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.ops.is_empty()
    }

    /// Snapshot of all pending operations, oldest first.
    pub async fn ops(&self) -> Vec<QueueOp> {
        self.inner.read().await.ops.iter().cloned().collect()
    }

    /// Discards all pending operations. Session teardown only: this is the
    /// intentional, session-scoped data loss of sign-out.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        if inner.ops.is_empty() {
            return;
        }
        warn!("Discarding {} unsynced operations", inner.ops.len());
        inner.ops.clear();
        self.persist(&inner).await;
    }

    async fn persist(&self, inner: &QueueInner) {
        self.cache.put_blob(QUEUE_SNAPSHOT, inner).await;
    }
}

impl QueueInner {
    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

/// Replay eligibility: the dependency (if any) must be resolved, and a
/// modify/remove must not target a temp id whose insert has not replayed
/// yet (promotion rekeys those subjects to permanent ids).
fn is_eligible(op: &QueueOp, remap: &RemapTable) -> bool {
    if let Some(dep) = &op.dependency {
        if !remap.contains(dep.parent) {
            return false;
        }
    }
    match op.verb {
        OpVerb::Insert => true,
        OpVerb::Modify | OpVerb::Remove => !op.subject.is_temp(),
    }
}
