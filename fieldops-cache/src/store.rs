//! Snapshot cache implementation.

use crate::CacheResult;
use fieldops_types::{Collection, Record, RecordId};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Persisted key-value snapshot store, one snapshot per collection.
///
/// The in-memory view is authoritative for reads; disk is a recovery copy
/// refreshed in the background after every write.
pub struct SnapshotCache {
    dir: PathBuf,
    /// Snapshot name -> JSON value (an array of records, or an opaque blob
    /// for internal consumers like the mutation queue).
    snapshots: Arc<RwLock<HashMap<String, Value>>>,
    /// Snapshots whose last flush failed; retried on the next write.
    dirty: Arc<Mutex<HashSet<String>>>,
    /// Serializes file writes so a stale background flush can never land
    /// after a newer one.
    io_lock: Arc<Mutex<()>>,
}

impl SnapshotCache {
    /// Opens the cache at `dir`, hydrating every snapshot found there.
    ///
    /// A snapshot that fails to parse is skipped with a warning and reads
    /// back as empty; it is overwritten on the next write to its collection.
    pub fn open(dir: impl Into<PathBuf>) -> CacheResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let mut snapshots = HashMap::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match std::fs::read(&path).map_err(crate::CacheError::from).and_then(|bytes| {
                serde_json::from_slice::<Value>(&bytes).map_err(Into::into)
            }) {
                Ok(value) => {
                    debug!("Hydrated snapshot '{}' from {}", name, path.display());
                    snapshots.insert(name.to_string(), value);
                }
                Err(e) => {
                    warn!("Skipping corrupt snapshot {}: {}", path.display(), e);
                }
            }
        }

        Ok(Self {
            dir,
            snapshots: Arc::new(RwLock::new(snapshots)),
            dirty: Arc::new(Mutex::new(HashSet::new())),
            io_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Returns the full record snapshot for a collection, in stored order.
    ///
    /// Never fails: a missing or corrupt snapshot yields an empty vec.
    pub async fn get_all(&self, collection: &Collection) -> Vec<Record> {
        let snapshots = self.snapshots.read().await;
        let Some(value) = snapshots.get(collection.as_str()) else {
            return Vec::new();
        };
        parse_records(collection, value)
    }

    /// Replaces the full snapshot for a collection.
    pub async fn put_all(&self, collection: &Collection, records: Vec<Record>) {
        self.store(collection.as_str(), json_array(records)).await;
    }

    /// Upserts one record by id, preserving snapshot order for existing ids.
    pub async fn put(&self, collection: &Collection, record: Record) {
        self.update(collection, |records| {
            match records.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record,
                None => records.push(record),
            }
            true
        })
        .await;
    }

    /// Deletes one record by id; no-op if absent.
    pub async fn remove(&self, collection: &Collection, id: &RecordId) {
        self.update(collection, |records| {
            let before = records.len();
            records.retain(|r| &r.id != id);
            records.len() != before
        })
        .await;
    }

    /// Mutates one collection's records in a single critical section under
    /// the snapshot write lock, so concurrent writers can never read a
    /// snapshot, suspend, and overwrite each other's updates. The closure
    /// returns whether it changed anything; unchanged snapshots are not
    /// re-flushed.
    pub async fn update(
        &self,
        collection: &Collection,
        mutate: impl FnOnce(&mut Vec<Record>) -> bool,
    ) {
        {
            let mut snapshots = self.snapshots.write().await;
            let mut records = snapshots
                .get(collection.as_str())
                .map(|value| parse_records(collection, value))
                .unwrap_or_default();
            if !mutate(&mut records) {
                return;
            }
            snapshots.insert(collection.as_str().to_string(), json_array(records));
        }
        self.schedule_with_retries(collection.as_str()).await;
    }

    /// Names of the record collections currently held. Internal snapshots
    /// (names starting with `__`) are excluded.
    pub async fn collections(&self) -> Vec<Collection> {
        self.snapshots
            .read()
            .await
            .keys()
            .filter(|name| !name.starts_with("__"))
            .map(|name| Collection::new(name.clone()))
            .collect()
    }

    /// Reads a non-record snapshot (used by the mutation queue for its own
    /// persistence). Returns `None` when missing or corrupt.
    pub async fn get_blob<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let snapshots = self.snapshots.read().await;
        let value = snapshots.get(name)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Corrupt snapshot '{}': {}", name, e);
                None
            }
        }
    }

    /// Replaces a non-record snapshot.
    pub async fn put_blob<T: Serialize>(&self, name: &str, blob: &T) {
        match serde_json::to_value(blob) {
            Ok(value) => self.store(name, value).await,
            Err(e) => warn!("Failed to serialize snapshot '{}': {}", name, e),
        }
    }

    /// Wipes every collection, in memory and on disk. Used on sign-out.
    pub async fn clear_all(&self) {
        let names: Vec<String> = {
            let mut snapshots = self.snapshots.write().await;
            let names = snapshots.keys().cloned().collect();
            snapshots.clear();
            names
        };
        self.dirty.lock().await.clear();
        // Sign-out must not leave stale snapshots behind, so deletion is
        // awaited rather than scheduled.
        for name in names {
            self.flush_one(&name).await;
        }
    }

    /// Awaits persistence of every snapshot. Teardown and test hook; the
    /// normal write path never blocks on disk.
    pub async fn flush(&self) {
        let mut names: HashSet<String> =
            self.snapshots.read().await.keys().cloned().collect();
        names.extend(self.dirty.lock().await.drain());
        for name in names {
            self.flush_one(&name).await;
        }
    }

    /// Updates the in-memory snapshot and schedules a background flush,
    /// together with any snapshots whose previous flush failed.
    async fn store(&self, name: &str, value: Value) {
        self.snapshots
            .write()
            .await
            .insert(name.to_string(), value);
        self.schedule_with_retries(name).await;
    }

    /// Schedules a flush of `name`, plus any snapshots whose previous
    /// flush failed.
    async fn schedule_with_retries(&self, name: &str) {
        let retries: Vec<String> = self.dirty.lock().await.drain().collect();
        for stale in retries {
            if stale != name {
                self.schedule_flush(stale);
            }
        }
        self.schedule_flush(name.to_string());
    }

    fn schedule_flush(&self, name: String) {
        let cache = self.clone_handles();
        tokio::spawn(async move {
            cache.flush_one(&name).await;
        });
    }

    /// Writes the current value of one snapshot to disk, or removes its
    /// file when the snapshot no longer exists. Reads the value under the
    /// io lock so flushes always persist the latest state.
    async fn flush_one(&self, name: &str) {
        let _guard = self.io_lock.lock().await;
        let value = self.snapshots.read().await.get(name).cloned();
        let result = match value {
            Some(value) => write_atomic(&self.dir, name, &value).await,
            None => remove_snapshot_file(&self.dir, name).await,
        };
        if let Err(e) = result {
            warn!("Failed to persist snapshot '{}', will retry: {}", name, e);
            self.dirty.lock().await.insert(name.to_string());
        }
    }

    fn clone_handles(&self) -> Self {
        Self {
            dir: self.dir.clone(),
            snapshots: Arc::clone(&self.snapshots),
            dirty: Arc::clone(&self.dirty),
            io_lock: Arc::clone(&self.io_lock),
        }
    }
}

impl Clone for SnapshotCache {
    fn clone(&self) -> Self {
        self.clone_handles()
    }
}

fn parse_records(collection: &Collection, value: &Value) -> Vec<Record> {
    match serde_json::from_value(value.clone()) {
        Ok(records) => records,
        Err(e) => {
            warn!("Corrupt snapshot for collection '{}': {}", collection, e);
            Vec::new()
        }
    }
}

fn json_array(records: Vec<Record>) -> Value {
    // Serializing records into a Value cannot fail: the field map is
    // already JSON.
    serde_json::to_value(records).unwrap_or(Value::Array(Vec::new()))
}

async fn write_atomic(dir: &Path, name: &str, value: &Value) -> CacheResult<()> {
    let bytes = serde_json::to_vec(value)?;
    let final_path = dir.join(format!("{name}.json"));
    let tmp_path = dir.join(format!("{name}.json.tmp"));
    tokio::fs::write(&tmp_path, &bytes).await?;
    tokio::fs::rename(&tmp_path, &final_path).await?;
    Ok(())
}

async fn remove_snapshot_file(dir: &Path, name: &str) -> CacheResult<()> {
    let path = dir.join(format!("{name}.json"));
    match tokio::fs::remove_file(&path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
