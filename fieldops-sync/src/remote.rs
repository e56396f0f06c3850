//! Remote record store interface.
//!
//! The remote system of record is abstracted behind [`RemoteStore`] so the
//! replay engine can work against any backend. Implementations must
//! classify failures as retryable or terminal: a retryable failure leaves
//! the operation queued for the next trigger, a terminal rejection moves it
//! to the dead-letter list instead of stalling the queue head.

use async_trait::async_trait;
use fieldops_types::{Collection, FieldMap, Record, RemoteId, TenantId};
use thiserror::Error;

/// A failed remote call, classified for the replayer.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RemoteError {
    /// Whether retrying the same call later can succeed (network outage,
    /// timeout, 5xx). Terminal rejections (validation failures) must set
    /// this to `false`.
    pub retryable: bool,
    /// Human-readable description, for logs and dead-letter diagnostics.
    pub message: String,
}

impl RemoteError {
    /// A transient failure; the operation stays queued and retries.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            retryable: true,
            message: message.into(),
        }
    }

    /// A terminal rejection; the operation is dead-lettered.
    #[must_use]
    pub fn terminal(message: impl Into<String>) -> Self {
        Self {
            retryable: false,
            message: message.into(),
        }
    }
}

/// Result type for remote store calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// The remote system of record.
///
/// Timeouts are the implementation's concern; the replayer treats them as
/// ordinary transient failures.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Creates a record remotely and returns its assigned permanent id.
    async fn insert(&self, collection: &Collection, payload: &FieldMap) -> RemoteResult<RemoteId>;

    /// Replaces a remote record's fields (last-write-wins, whole record).
    async fn update(
        &self,
        collection: &Collection,
        id: &RemoteId,
        payload: &FieldMap,
    ) -> RemoteResult<()>;

    /// Deletes a remote record.
    async fn delete(&self, collection: &Collection, id: &RemoteId) -> RemoteResult<()>;

    /// Fetches the tenant-scoped snapshot of a collection.
    async fn query(&self, collection: &Collection, tenant: TenantId) -> RemoteResult<Vec<Record>>;
}
