//! Shared test fixtures for the sync crate.

#![allow(dead_code)]

use async_trait::async_trait;
use fieldops_sync::{RemoteError, RemoteResult, RemoteStore};
use fieldops_types::{Collection, FieldMap, Record, RecordId, RemoteId, TenantId};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Installs a test log subscriber honoring `RUST_LOG`. Later calls are
/// no-ops, so every fixture builder can call it unconditionally.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory remote record store with failure injection.
///
/// Assigns permanent ids of the form `R-100`, `R-101`, ... and logs every
/// call so tests can assert on remote effect counts.
pub struct MockRemote {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    tables: HashMap<Collection, Vec<Record>>,
    calls: Vec<String>,
    /// Number of upcoming calls to fail transiently.
    transient_failures: usize,
    /// Collections whose inserts are terminally rejected.
    rejected_collections: HashSet<Collection>,
    /// Fail queries only (replay unaffected).
    fail_queries: bool,
}

impl MockRemote {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 100,
                ..Inner::default()
            }),
        }
    }

    /// Makes the next `n` calls fail with a transient error.
    pub fn fail_next(&self, n: usize) {
        self.inner.lock().unwrap().transient_failures = n;
    }

    /// Terminally rejects every insert into `collection`.
    pub fn reject_inserts_into(&self, collection: &str) {
        self.inner
            .lock()
            .unwrap()
            .rejected_collections
            .insert(Collection::from(collection));
    }

    /// Makes queries fail transiently until called with `false`.
    pub fn set_fail_queries(&self, fail: bool) {
        self.inner.lock().unwrap().fail_queries = fail;
    }

    /// Seeds a server-side record.
    pub fn seed(&self, collection: &str, id: &str, fields: FieldMap) {
        let collection = Collection::from(collection);
        let record = Record::new(
            collection.clone(),
            RecordId::Remote(RemoteId::new(id)),
            fields,
        );
        self.inner
            .lock()
            .unwrap()
            .tables
            .entry(collection)
            .or_default()
            .push(record);
    }

    /// Every call made so far, e.g. `"insert leads"`.
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap().calls.len()
    }

    /// Current server-side state of a collection.
    pub fn table(&self, collection: &str) -> Vec<Record> {
        self.inner
            .lock()
            .unwrap()
            .tables
            .get(&Collection::from(collection))
            .cloned()
            .unwrap_or_default()
    }

    fn check_failure(inner: &mut Inner) -> RemoteResult<()> {
        if inner.transient_failures > 0 {
            inner.transient_failures -= 1;
            return Err(RemoteError::transient("connection reset"));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MockRemote {
    async fn insert(&self, collection: &Collection, payload: &FieldMap) -> RemoteResult<RemoteId> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("insert {collection}"));
        Self::check_failure(&mut inner)?;
        if inner.rejected_collections.contains(collection) {
            return Err(RemoteError::terminal("validation failed"));
        }

        let id = RemoteId::new(format!("R-{}", inner.next_id));
        inner.next_id += 1;
        let record = Record::new(
            collection.clone(),
            RecordId::Remote(id.clone()),
            payload.clone(),
        );
        inner
            .tables
            .entry(collection.clone())
            .or_default()
            .push(record);
        Ok(id)
    }

    async fn update(
        &self,
        collection: &Collection,
        id: &RemoteId,
        payload: &FieldMap,
    ) -> RemoteResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("update {collection}"));
        Self::check_failure(&mut inner)?;

        let target = RecordId::Remote(id.clone());
        let table = inner.tables.entry(collection.clone()).or_default();
        match table.iter_mut().find(|r| r.id == target) {
            Some(record) => record.fields = payload.clone(),
            None => return Err(RemoteError::terminal(format!("no such record {id}"))),
        }
        Ok(())
    }

    async fn delete(&self, collection: &Collection, id: &RemoteId) -> RemoteResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("delete {collection}"));
        Self::check_failure(&mut inner)?;

        let target = RecordId::Remote(id.clone());
        if let Some(table) = inner.tables.get_mut(collection) {
            table.retain(|r| r.id != target);
        }
        Ok(())
    }

    async fn query(&self, collection: &Collection, _tenant: TenantId) -> RemoteResult<Vec<Record>> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("query {collection}"));
        if inner.fail_queries {
            return Err(RemoteError::transient("offline"));
        }
        Self::check_failure(&mut inner)?;
        Ok(inner.tables.get(collection).cloned().unwrap_or_default())
    }
}

/// Builds a field map from string pairs.
pub fn fields(pairs: &[(&str, &str)]) -> FieldMap {
    let mut map = FieldMap::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), serde_json::Value::String((*v).to_string()));
    }
    map
}
