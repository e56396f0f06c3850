//! Stale-while-revalidate read path.
//!
//! On screen entry: serve the cached view immediately, then refresh from
//! the network. Records with a pending queue operation are owned by the
//! queue — the refresh never resurrects a record a pending remove is about
//! to delete, and never overwrites an in-flight local modify with older
//! server data.

use crate::Projector;
use crate::remote::RemoteStore;
use fieldops_cache::SnapshotCache;
use fieldops_queue::MutationQueue;
use fieldops_types::{Collection, Record, TenantId};
use std::sync::Arc;
use tracing::{debug, warn};

/// Hydrate-then-refresh fetcher used by every screen.
pub struct Fetcher {
    cache: Arc<SnapshotCache>,
    queue: Arc<MutationQueue>,
    projector: Projector,
    remote: Arc<dyn RemoteStore>,
    tenant: TenantId,
}

impl Fetcher {
    /// Creates a fetcher over shared session state.
    pub fn new(
        cache: Arc<SnapshotCache>,
        queue: Arc<MutationQueue>,
        projector: Projector,
        remote: Arc<dyn RemoteStore>,
        tenant: TenantId,
    ) -> Self {
        Self {
            cache,
            queue,
            projector,
            remote,
            tenant,
        }
    }

    /// Screen-entry read path for one collection.
    ///
    /// Hydrates the projector from the cache if it has nothing for this
    /// collection (the UI never blocks on network), then queries the remote
    /// store. On success the server snapshot replaces projector and cache,
    /// except for queue-owned records. On failure the cache-derived state
    /// stays untouched and no error is surfaced.
    pub async fn refresh(&self, collection: &Collection) {
        if self.projector.is_empty(collection).await {
            let cached = self.cache.get_all(collection).await;
            debug!(
                "Hydrating '{}' from cache ({} records)",
                collection,
                cached.len()
            );
            self.projector.replace(collection.clone(), cached).await;
        }

        let fresh = match self.remote.query(collection, self.tenant).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Refresh of '{}' failed, keeping cached state: {}", collection, e);
                return;
            }
        };

        let merged = self.merge_with_pending(collection, fresh).await;
        self.projector
            .replace(collection.clone(), merged.clone())
            .await;
        self.cache.put_all(collection, merged).await;
    }

    /// Overlays the server snapshot with the local versions of queue-owned
    /// records: pending creates stay visible, pending modifies keep their
    /// local fields, pending removes stay gone.
    async fn merge_with_pending(
        &self,
        collection: &Collection,
        fresh: Vec<Record>,
    ) -> Vec<Record> {
        let owned = self.queue.pending_ids(collection).await;
        if owned.is_empty() {
            return fresh;
        }

        let local = self.projector.snapshot(collection).await;
        let mut merged: Vec<Record> = fresh
            .into_iter()
            .filter(|r| !owned.contains(&r.id))
            .collect();
        merged.extend(
            local
                .into_iter()
                .filter(|r| owned.contains(&r.id)),
        );
        merged
    }
}
