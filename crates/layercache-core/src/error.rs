//! Error types for coordinator and handle operations

use thiserror::Error;

/// Main error type for coordinator and handle operations.
///
/// Variants correspond to the error taxonomy the coordinator recognizes;
/// handle implementations surface their own failures as
/// [`CacheError::TransientBackendFailure`] or [`CacheError::Backend`].
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Null/empty key or region, non-positive expiration timeout, or a
    /// timeout below a handle's supported resolution floor.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An update/get-or-add operation exhausted its retries, its factory
    /// returned null, or the coordinator was constructed with zero handles.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// An operation was attempted after the coordinator was disposed.
    #[error("coordinator is disposed")]
    Disposed,

    /// The caller's cancellation signal fired while the operation was
    /// suspended at a handle boundary.
    #[error("operation canceled by caller")]
    CanceledByCaller,

    /// A handle's I/O or transport failed; the coordinator logs and
    /// continues with remaining handles where possible.
    #[error("transient backend failure: {0}")]
    TransientBackendFailure(String),

    /// Opaque backend error not covered by the taxonomy above (used by
    /// handle implementations for wire/codec failures).
    #[error("backend error: {0}")]
    Backend(String),

    /// A version/CAS check failed during a handle-internal update attempt.
    #[error("version conflict: expected {expected}, got {actual}")]
    VersionConflict { expected: u64, actual: u64 },
}

/// Result type alias for coordinator and handle operations.
pub type Result<T> = std::result::Result<T, CacheError>;
