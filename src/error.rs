//! Typed error handling for dispatch operations.
//!
//! This module distinguishes between:
//! - Store errors - fatal to the current cycle, retried wholesale next cycle
//! - Transport errors - per-attempt, classified permanent or transient

use thiserror::Error;

/// Errors raised by the persistent store boundaries.
///
/// Any store error raised while selecting due reminders or resolving
/// subscriptions aborts the cycle; store errors during reconciliation and
/// the retention sweep are logged and tolerated.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to reach the backing store.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A read or write against the store failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Internal error (lock poisoning, etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

// Convenience conversion for lock poisoning in the memory backends
impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Internal(format!("Lock poisoned: {e}"))
    }
}

/// A failed delivery attempt, as reported by the push transport.
///
/// Carries the provider's HTTP status code when one was received; failures
/// without a status (connection refused, timeout, TLS) have none.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The push service answered with a non-success status code.
    #[error("Endpoint rejected delivery with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The attempt failed before any status code was received.
    #[error("Delivery failed: {0}")]
    Other(String),
}

impl TransportError {
    /// The HTTP status code the push service answered with, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Other(_) => None,
        }
    }

    /// Classify this failure for reconciliation.
    ///
    /// 404 and 410 mean the push service has forgotten the endpoint: the
    /// subscription is dead and gets deleted. Every other failure, including
    /// those with no status code at all, is treated as recoverable.
    #[must_use]
    pub const fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Status {
                status: 404 | 410, ..
            } => FailureKind::Permanent,
            Self::Status { .. } | Self::Other(_) => FailureKind::Transient,
        }
    }
}

/// Classification of a failed delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The endpoint will never accept deliveries again; delete it.
    Permanent,
    /// Possibly recoverable on a future cycle; log and move on.
    Transient,
}

/// Top-level error for a dispatch cycle.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Data access failed while selecting or resolving; the cycle aborts
    /// and is retried wholesale on the next invocation.
    #[error("Data access failed: {0}")]
    Store(#[from] StoreError),
}
