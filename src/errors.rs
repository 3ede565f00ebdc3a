use std::time::Duration;
use thiserror::Error;

// -----------------------------------------------------------------------------
// ----- ConnectionError -------------------------------------------------------

/// Failures while turning a registered connection into a live client.
///
/// These abort the enclosing operation: nothing can proceed without a client.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("no endpoints configured")]
    NoEndpoints,

    #[error("failed to create store client: {0}")]
    DialFailed(String),

    #[error("store is unreachable: {0}")]
    Unreachable(String),
}

// -----------------------------------------------------------------------------
// ----- StoreError ------------------------------------------------------------

/// Failures of individual store operations against a resolved client.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("backend error: {0}")]
    Backend(String),
}

// -----------------------------------------------------------------------------
// ----- TransferError ---------------------------------------------------------

/// Failures of cross-connection data movement.
///
/// Per-key failures inside a bulk transfer never surface here; they are
/// accumulated in the outcome instead. These variants cover the cases that
/// reject or abort the whole request.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("source and target connections are the same")]
    SameConnection,

    #[error("failed to list keys from source: {0}")]
    ListFailed(#[source] StoreError),

    #[error("target key already exists: {0}")]
    TargetExists(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
