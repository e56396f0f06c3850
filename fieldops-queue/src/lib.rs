//! Durable mutation queue for the FieldOps offline core.
//!
//! Every local create/modify/remove lands here as a [`QueueOp`] and stays
//! until its remote replay succeeds (or is terminally rejected). The queue
//! persists through the snapshot cache, so pending work survives restarts.
//!
//! The dependency resolver lives here too: operations whose payload
//! references a not-yet-synced parent are withheld from replay until the
//! remap table learns the parent's permanent id, and are rewritten in place
//! once it does.

mod queue;
mod remap;

pub use queue::{MutationQueue, QUEUE_SNAPSHOT};
pub use remap::RemapTable;
