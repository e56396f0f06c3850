//! Replay engine and read path for the FieldOps offline core.
//!
//! Ties the workspace together: the optimistic projector every screen
//! reads, the replayer that drains the mutation queue against the remote
//! record store, the stale-while-revalidate fetcher, and the session
//! lifecycle that scopes all of it to one signed-in tenant.
//!
//! # Data flow
//!
//! 1. **Mutation**: a screen calls [`Session::create`] / [`Session::modify`]
//!    / [`Session::remove`]. The projector updates synchronously, the cache
//!    persists in the background, and the operation lands in the durable
//!    queue — tagged with a dependency when it references a record that has
//!    no permanent id yet.
//! 2. **Replay**: when online (after every mutation, and on every
//!    offline-to-online transition) the [`Replayer`] drains the queue in
//!    order. The first successful insert for a record promotes its temp id;
//!    the permanent id is rewritten everywhere it appears.
//! 3. **Read**: on screen entry the [`Fetcher`] serves the cached view
//!    immediately and refreshes from the network, leaving queue-owned
//!    records alone.
//!
//! All replay failures are silent toward the presentation layer: the
//! device's optimistic view is authoritative until reconciliation
//! completes.
//!
//! # Example
//!
//! ```no_run
//! use fieldops_sync::{Connectivity, Session, SessionConfig};
//! use fieldops_types::TenantId;
//! use std::sync::Arc;
//!
//! # async fn run(remote: Arc<dyn fieldops_sync::RemoteStore>) -> fieldops_sync::SyncResult<()> {
//! let connectivity = Connectivity::new(true);
//! let session = Session::init(
//!     SessionConfig {
//!         data_dir: "/var/lib/fieldops".into(),
//!         tenant: TenantId::new(),
//!     },
//!     remote,
//!     connectivity,
//! )
//! .await?;
//!
//! let mut fields = serde_json::Map::new();
//! fields.insert("name".into(), "Acme Co".into());
//! let lead = session.create("leads", fields).await;
//! # let _ = lead;
//! # Ok(())
//! # }
//! ```

mod connectivity;
mod error;
mod fetcher;
mod projector;
mod remote;
mod replayer;
mod session;

pub use connectivity::Connectivity;
pub use error::{SyncError, SyncResult};
pub use fetcher::Fetcher;
pub use projector::Projector;
pub use remote::{RemoteError, RemoteResult, RemoteStore};
pub use replayer::{DeadLetter, Replayer};
pub use session::{Session, SessionConfig};
