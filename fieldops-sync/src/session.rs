//! Session lifecycle and mutation surface.
//!
//! A [`Session`] is the explicitly constructed, tenant-scoped object the
//! presentation layer talks to. It wires cache, queue, projector, replayer
//! and fetcher together for one signed-in tenant, and tears them all down
//! on sign-out. There is no ambient global state.

use crate::connectivity::Connectivity;
use crate::fetcher::Fetcher;
use crate::remote::RemoteStore;
use crate::replayer::{DeadLetter, Replayer};
use crate::{Projector, SyncResult};
use fieldops_cache::SnapshotCache;
use fieldops_queue::{MutationQueue, RemapTable};
use fieldops_types::{Collection, FieldMap, QueueOp, Record, RecordId, TempId, TenantId};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Configuration for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory holding this session's cache snapshots.
    pub data_dir: PathBuf,
    /// The tenant scoping every remote query.
    pub tenant: TenantId,
}

/// One signed-in tenant's offline core: optimistic view, durable cache,
/// mutation queue, and replay engine.
pub struct Session {
    cache: Arc<SnapshotCache>,
    queue: Arc<MutationQueue>,
    projector: Projector,
    remap: Arc<RwLock<RemapTable>>,
    replayer: Arc<Replayer>,
    fetcher: Fetcher,
    connectivity: Connectivity,
    watcher: JoinHandle<()>,
}

impl Session {
    /// Initializes a session: opens the cache, reloads any pending queue
    /// from a previous run, and starts the online-transition watcher. If
    /// currently online, a replay pass for reloaded work is scheduled
    /// immediately.
    pub async fn init(
        config: SessionConfig,
        remote: Arc<dyn RemoteStore>,
        connectivity: Connectivity,
    ) -> SyncResult<Self> {
        let cache = Arc::new(SnapshotCache::open(config.data_dir)?);
        let queue = Arc::new(MutationQueue::load(Arc::clone(&cache)).await);
        let projector = Projector::new();
        let remap = Arc::new(RwLock::new(RemapTable::new()));

        let replayer = Arc::new(Replayer::new(
            Arc::clone(&cache),
            Arc::clone(&queue),
            projector.clone(),
            Arc::clone(&remap),
            Arc::clone(&remote),
            connectivity.clone(),
        ));
        let fetcher = Fetcher::new(
            Arc::clone(&cache),
            Arc::clone(&queue),
            projector.clone(),
            Arc::clone(&remote),
            config.tenant,
        );

        let watcher = spawn_online_watcher(&connectivity, Arc::clone(&replayer));

        info!("Session initialized for tenant {}", config.tenant);

        if connectivity.is_online() && !queue.is_empty().await {
            let replayer = Arc::clone(&replayer);
            tokio::spawn(async move { replayer.process_queue().await });
        }

        Ok(Self {
            cache,
            queue,
            projector,
            remap,
            replayer,
            fetcher,
            connectivity,
            watcher,
        })
    }

    // ── Mutation surface ─────────────────────────────────────────

    /// Creates a record locally and queues its insert. Returns the temp id
    /// the record carries until promotion.
    ///
    /// Field values referencing a not-yet-synced record's temp id tag the
    /// queued insert with a dependency; references to already-promoted
    /// temp ids are rewritten to permanent ids up front.
    pub async fn create(&self, collection: impl Into<Collection>, mut fields: FieldMap) -> TempId {
        let collection = collection.into();
        let dependency = self.resolve_references(&mut fields).await;

        let temp = TempId::new();
        let record = Record::new(collection.clone(), temp, fields.clone());
        self.projector.upsert(record.clone()).await;
        self.cache.put(&collection, record).await;
        self.queue
            .enqueue_insert(collection, temp, fields, dependency)
            .await;
        self.trigger_replay();
        temp
    }

    /// Replaces a record's fields locally and queues the modify
    /// (last-write-wins on the whole record).
    pub async fn modify(
        &self,
        collection: impl Into<Collection>,
        id: RecordId,
        mut fields: FieldMap,
    ) {
        let collection = collection.into();
        let dependency = self.resolve_references(&mut fields).await;
        let id = self.remap.read().await.resolve_id(&id);

        let record = Record::new(collection.clone(), id.clone(), fields.clone());
        self.projector.upsert(record.clone()).await;
        self.cache.put(&collection, record).await;
        self.queue
            .enqueue_modify(collection, id, fields, dependency)
            .await;
        self.trigger_replay();
    }

    /// Removes a record locally and queues the remote delete.
    ///
    /// Removing a record that never synced collapses its pending
    /// operations instead — zero remote calls — and cascades to children
    /// created offline against it, since their parent will never exist
    /// remotely.
    pub async fn remove(&self, collection: impl Into<Collection>, id: RecordId) {
        let collection = collection.into();
        let id = self.remap.read().await.resolve_id(&id);

        self.projector.remove(&collection, &id).await;
        self.cache.remove(&collection, &id).await;

        let Some(temp) = id.as_temp() else {
            self.queue.enqueue_remove(collection, id).await;
            self.trigger_replay();
            return;
        };

        let cancelled = self.queue.cancel_for(temp).await;
        for op in &cancelled {
            if op.targets_temp(temp) {
                continue;
            }
            debug!(
                "Cascading local removal to {} in '{}'",
                op.subject, op.collection
            );
            self.projector.remove(&op.collection, &op.subject).await;
            self.cache.remove(&op.collection, &op.subject).await;
        }
    }

    // ── Read surface ─────────────────────────────────────────────

    /// The optimistic view of a collection. Synchronous with respect to
    /// prior mutations: a read after a mutation call observes it.
    pub async fn records(&self, collection: &Collection) -> Vec<Record> {
        self.projector.snapshot(collection).await
    }

    /// Screen-entry read path: hydrate from cache if needed, then refresh
    /// from the network (see [`Fetcher::refresh`]).
    pub async fn refresh(&self, collection: &Collection) {
        self.fetcher.refresh(collection).await;
    }

    // ── Replay and diagnostics ───────────────────────────────────

    /// Runs a replay pass to completion. Triggers normally fire on their
    /// own; this is for callers that need to await reconciliation.
    pub async fn replay_now(&self) {
        self.replayer.process_queue().await;
    }

    /// Pending operations, oldest first.
    pub async fn pending_ops(&self) -> Vec<QueueOp> {
        self.queue.ops().await
    }

    /// Whether every queued mutation has been reconciled.
    pub async fn is_reconciled(&self) -> bool {
        self.queue.is_empty().await
    }

    /// Operations the remote store terminally rejected this session.
    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.replayer.dead_letters().await
    }

    /// The session's connectivity signal.
    #[must_use]
    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// Awaits persistence of all local state. The platform layer calls
    /// this when the app is backgrounded; the normal write path never
    /// blocks on disk.
    pub async fn flush(&self) {
        self.cache.flush().await;
    }

    /// Tears the session down on sign-out: stops the watcher, discards the
    /// unsynced queue (intentional, session-scoped data loss), and wipes
    /// every cached collection.
    pub async fn teardown(self) {
        self.watcher.abort();
        self.queue.clear().await;
        self.projector.clear().await;
        self.cache.clear_all().await;
        self.cache.flush().await;
        info!("Session torn down");
    }

    /// Schedules a replay pass if currently online.
    fn trigger_replay(&self) {
        if !self.connectivity.is_online() {
            return;
        }
        let replayer = Arc::clone(&self.replayer);
        tokio::spawn(async move { replayer.process_queue().await });
    }

    /// Scans a payload for references to other records' temp ids. The
    /// first reference to a still-pending insert becomes the dependency
    /// tag; references to promoted temp ids are rewritten in place.
    async fn resolve_references(&self, fields: &mut FieldMap) -> Option<(String, TempId)> {
        let pending = self.queue.pending_insert_temps().await;
        let remap = self.remap.read().await;
        resolve_field_references(fields, &pending, &remap)
    }
}

fn spawn_online_watcher(
    connectivity: &Connectivity,
    replayer: Arc<Replayer>,
) -> JoinHandle<()> {
    let mut rx = connectivity.subscribe();
    tokio::spawn(async move {
        let mut was_online = *rx.borrow();
        while rx.changed().await.is_ok() {
            let online = *rx.borrow_and_update();
            if online && !was_online {
                debug!("Came online, draining queue");
                replayer.process_queue().await;
            }
            was_online = online;
        }
    })
}

fn resolve_field_references(
    fields: &mut FieldMap,
    pending: &HashSet<TempId>,
    remap: &RemapTable,
) -> Option<(String, TempId)> {
    let mut dependency = None;
    for (field, value) in fields.iter_mut() {
        let Some(temp) = value.as_str().and_then(|s| TempId::parse(s).ok()) else {
            continue;
        };
        if let Some(remote) = remap.resolve(temp) {
            *value = serde_json::Value::String(remote.to_string());
        } else if pending.contains(&temp) && dependency.is_none() {
            dependency = Some((field.clone(), temp));
        }
    }
    dependency
}
