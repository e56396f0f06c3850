//! Core type definitions for the FieldOps offline core.
//!
//! Shared vocabulary types used by every other crate in the workspace:
//! record identifiers, collections, records, and queued mutation operations.

mod ids;
mod op;
mod record;

pub use ids::{RecordId, RemoteId, TempId, TenantId};
pub use op::{DependencyTag, OpVerb, QueueOp};
pub use record::{Collection, FieldMap, Record};
