//! Error types for the sync layer.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in session and sync operations.
///
/// Remote replay failures are intentionally absent: they stay inside the
/// replayer (requeue or dead-letter) and are never surfaced as errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Cache layer error (opening or persisting the local store).
    #[error("cache error: {0}")]
    Cache(#[from] fieldops_cache::CacheError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
