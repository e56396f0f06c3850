//! Replay engine — drains the mutation queue against the remote store.
//!
//! Delivery contract: at-least-once, strict in-order per collection. An
//! operation leaves the queue only after its remote call completed, so a
//! transient failure retries the same operation (and everything behind it)
//! on the next trigger, never skipping ahead. A terminal rejection moves
//! the operation to the dead-letter list so it cannot stall the queue head
//! forever.

use crate::Projector;
use crate::connectivity::Connectivity;
use crate::remote::{RemoteError, RemoteStore};
use fieldops_cache::SnapshotCache;
use fieldops_queue::{MutationQueue, RemapTable};
use fieldops_types::{OpVerb, QueueOp, RecordId, RemoteId, TempId};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// An operation the remote store terminally rejected, kept for diagnostics.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    /// The rejected operation.
    pub op: QueueOp,
    /// The remote store's rejection message.
    pub reason: String,
}

/// Drains the queue when online; owns promotion of temp ids.
pub struct Replayer {
    cache: Arc<SnapshotCache>,
    queue: Arc<MutationQueue>,
    projector: Projector,
    remap: Arc<RwLock<RemapTable>>,
    remote: Arc<dyn RemoteStore>,
    connectivity: Connectivity,
    /// Single-flight guard: concurrent triggers serialize on this lock and
    /// converge on draining the same queue without duplicate remote calls.
    drain_lock: Arc<Mutex<()>>,
    dead_letters: Arc<RwLock<Vec<DeadLetter>>>,
}

impl Replayer {
    /// Creates a replayer over shared session state.
    pub fn new(
        cache: Arc<SnapshotCache>,
        queue: Arc<MutationQueue>,
        projector: Projector,
        remap: Arc<RwLock<RemapTable>>,
        remote: Arc<dyn RemoteStore>,
        connectivity: Connectivity,
    ) -> Self {
        Self {
            cache,
            queue,
            projector,
            remap,
            remote,
            connectivity,
            drain_lock: Arc::new(Mutex::new(())),
            dead_letters: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Drains eligible operations in order until the queue is empty, the
    /// device goes offline, or a transient failure stops the run.
    ///
    /// Idempotent and safe under re-entrant invocation: a pass that lost
    /// the race simply finds the operations already removed.
    pub async fn process_queue(&self) {
        let _guard = self.drain_lock.lock().await;

        loop {
            if !self.connectivity.is_online() {
                debug!("Offline, stopping replay pass");
                return;
            }

            let next = {
                let remap = self.remap.read().await;
                self.queue.next_eligible(&remap).await
            };
            let Some(op) = next else {
                return;
            };

            match self.replay_one(&op).await {
                Ok(()) => {
                    self.queue.complete(op.seq).await;
                }
                Err(e) if e.retryable => {
                    warn!(
                        "Transient failure replaying {:?} {} (seq {}), will retry: {}",
                        op.verb, op.subject, op.seq, e
                    );
                    return;
                }
                Err(e) => {
                    warn!(
                        "Remote store rejected {:?} {} (seq {}), dead-lettering: {}",
                        op.verb, op.subject, op.seq, e
                    );
                    self.dead_letter(op, e.message).await;
                }
            }
        }
    }

    /// Performs the matching remote call for one operation.
    async fn replay_one(&self, op: &QueueOp) -> Result<(), RemoteError> {
        match (op.verb, &op.subject) {
            (OpVerb::Insert, RecordId::Temp(temp)) => {
                let remote_id = self.remote.insert(&op.collection, &op.payload).await?;
                info!("Promoted {} -> {}", temp, remote_id);
                self.promote(*temp, remote_id).await;
                Ok(())
            }
            // The create landed in a prior run that was interrupted after
            // promotion but before dequeue; the record already exists.
            (OpVerb::Insert, RecordId::Remote(id)) => {
                self.remote.update(&op.collection, id, &op.payload).await
            }
            (OpVerb::Modify, RecordId::Remote(id)) => {
                self.remote.update(&op.collection, id, &op.payload).await
            }
            (OpVerb::Remove, RecordId::Remote(id)) => {
                self.remote.delete(&op.collection, id).await
            }
            // Eligibility guarantees modify/remove subjects are permanent.
            (verb, RecordId::Temp(temp)) => {
                warn!("Skipping {:?} against unpromoted temp id {}", verb, temp);
                Ok(())
            }
        }
    }

    /// Records a promotion and rewrites the temp id everywhere it appears:
    /// remap table, queued operations, cache snapshots, projector.
    async fn promote(&self, temp: TempId, remote_id: RemoteId) {
        self.remap.write().await.record(temp, remote_id.clone());
        self.queue.rekey(temp, &remote_id).await;
        self.rekey_cache(temp, &remote_id).await;
        self.projector.rekey(temp, &remote_id).await;
    }

    /// Rewrites a promoted temp id in every cached collection snapshot,
    /// both record ids and string fields referencing it. Each collection
    /// is rewritten atomically so a concurrent mutation-path write cannot
    /// interleave with the rekey.
    async fn rekey_cache(&self, temp: TempId, remote_id: &RemoteId) {
        let temp_str = temp.to_string();
        for collection in self.cache.collections().await {
            self.cache
                .update(&collection, |records| {
                    let mut touched = false;
                    for record in records.iter_mut() {
                        if record.id == RecordId::Temp(temp) {
                            record.id = RecordId::Remote(remote_id.clone());
                            touched = true;
                        }
                        for value in record.fields.values_mut() {
                            if value.as_str() == Some(temp_str.as_str()) {
                                *value = serde_json::Value::String(remote_id.to_string());
                                touched = true;
                            }
                        }
                    }
                    touched
                })
                .await;
        }
    }

    /// Moves a terminally rejected operation to the dead-letter list. A
    /// rejected insert cascades: children whose pending operations wait on
    /// its temp id can never replay, so they are dead-lettered too.
    async fn dead_letter(&self, op: QueueOp, reason: String) {
        let removed = self.queue.take(op.seq).await;
        let subject_temp = op.subject.as_temp();

        let mut letters = self.dead_letters.write().await;
        if removed.is_some() {
            letters.push(DeadLetter {
                op: op.clone(),
                reason: reason.clone(),
            });
        }

        if op.verb == OpVerb::Insert {
            if let Some(temp) = subject_temp {
                for orphan in self.queue.cancel_for(temp).await {
                    letters.push(DeadLetter {
                        op: orphan,
                        reason: format!("parent {temp} rejected: {reason}"),
                    });
                }
            }
        }
    }

    /// Operations the remote store terminally rejected this session.
    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.read().await.clone()
    }
}
