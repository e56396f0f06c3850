mod common;

use common::{MockRemote, fields};
use fieldops_sync::{Connectivity, Session, SessionConfig};
use fieldops_types::{Collection, RecordId, RemoteId, TenantId};
use std::path::Path;
use std::sync::Arc;

async fn session_at(dir: &Path, remote: Arc<MockRemote>, online: bool) -> Session {
    common::init_tracing();
    Session::init(
        SessionConfig {
            data_dir: dir.to_path_buf(),
            tenant: TenantId::new(),
        },
        remote,
        Connectivity::new(online),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn refresh_replaces_view_with_server_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(MockRemote::new());
    remote.seed("leads", "L-1", fields(&[("name", "Acme")]));
    remote.seed("leads", "L-2", fields(&[("name", "Globex")]));

    let session = session_at(dir.path(), remote, true).await;
    let leads = Collection::from("leads");

    session.refresh(&leads).await;
    let view = session.records(&leads).await;
    assert_eq!(view.len(), 2);
    assert_eq!(view[0].id, RecordId::Remote(RemoteId::new("L-1")));
}

#[tokio::test]
async fn refresh_failure_falls_back_to_cache_silently() {
    let dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(MockRemote::new());
    remote.seed("leads", "L-1", fields(&[("name", "Acme")]));
    let leads = Collection::from("leads");

    // First session fills the cache from the network.
    let session = session_at(dir.path(), remote.clone(), true).await;
    session.refresh(&leads).await;
    session.flush().await;
    drop(session);

    // Second session: the network is down, the cached snapshot serves.
    remote.set_fail_queries(true);
    let revived = session_at(dir.path(), remote, true).await;
    revived.refresh(&leads).await;

    let view = revived.records(&leads).await;
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].get_str("name"), Some("Acme"));
}

#[tokio::test]
async fn refresh_does_not_resurrect_a_pending_remove() {
    let dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(MockRemote::new());
    remote.seed("leads", "L-1", fields(&[("name", "Acme")]));
    let leads = Collection::from("leads");

    let session = session_at(dir.path(), remote.clone(), true).await;
    session.refresh(&leads).await;

    // Go offline, remove the record; the delete is queued, not replayed.
    session.connectivity().set_online(false);
    session
        .remove("leads", RecordId::Remote(RemoteId::new("L-1")))
        .await;
    assert!(session.records(&leads).await.is_empty());

    // The server still has the record, but the queue owns it.
    session.refresh(&leads).await;
    assert!(session.records(&leads).await.is_empty());
}

#[tokio::test]
async fn refresh_keeps_an_inflight_modify() {
    let dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(MockRemote::new());
    remote.seed("leads", "L-1", fields(&[("name", "Acme")]));
    let leads = Collection::from("leads");

    let session = session_at(dir.path(), remote.clone(), true).await;
    session.refresh(&leads).await;

    session.connectivity().set_online(false);
    session
        .modify(
            "leads",
            RecordId::Remote(RemoteId::new("L-1")),
            fields(&[("name", "Acme Co")]),
        )
        .await;

    // Server data is older than the in-flight local modify.
    session.refresh(&leads).await;
    let view = session.records(&leads).await;
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].get_str("name"), Some("Acme Co"));
}

#[tokio::test]
async fn refresh_keeps_a_pending_create() {
    let dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(MockRemote::new());
    remote.seed("leads", "L-1", fields(&[("name", "Acme")]));
    let leads = Collection::from("leads");

    let session = session_at(dir.path(), remote.clone(), false).await;
    let temp = session.create("leads", fields(&[("name", "Offline Lead")])).await;

    session.refresh(&leads).await;
    let view = session.records(&leads).await;
    assert_eq!(view.len(), 2);
    assert!(view.iter().any(|r| r.id == RecordId::Temp(temp)));
    assert!(
        view.iter()
            .any(|r| r.id == RecordId::Remote(RemoteId::new("L-1")))
    );
}

#[tokio::test]
async fn refresh_updates_the_durable_cache() {
    let dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(MockRemote::new());
    remote.seed("leads", "L-1", fields(&[("name", "Acme")]));
    let leads = Collection::from("leads");

    let session = session_at(dir.path(), remote.clone(), true).await;
    session.refresh(&leads).await;
    session.flush().await;
    drop(session);

    // A restart with no network sees the refreshed snapshot.
    remote.set_fail_queries(true);
    let revived = session_at(dir.path(), remote, true).await;
    revived.refresh(&leads).await;
    assert_eq!(revived.records(&leads).await.len(), 1);
}
