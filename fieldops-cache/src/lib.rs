//! Local durable cache for the FieldOps offline core.
//!
//! One JSON snapshot file per collection, replaced atomically on every
//! write (temp file then rename). Snapshots are the unit of durability:
//! a crash mid-write never corrupts previously persisted collections, and
//! a corrupt or missing snapshot reads back as empty rather than failing.
//!
//! Writes update the in-memory view synchronously and persist in the
//! background; a crash between the call and the flush loses at most the
//! latest write. When a flush fails the cache keeps operating in memory
//! and retries persistence on the next write.

mod error;
mod store;

pub use error::{CacheError, CacheResult};
pub use store::SnapshotCache;
