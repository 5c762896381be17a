//! Persistent store boundaries
//!
//! The dispatcher treats both stores as opaque data-access collaborators:
//! - `ReminderStore`: due-reminder selection, batch mark-as-sent, retention purge
//! - `SubscriptionStore`: per-recipient subscription lookup, batch endpoint delete
//!
//! All writes are set-based batch operations; correctness across overlapping
//! invocations relies on their idempotence, not on locking.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::{MemoryReminderStore, MemorySubscriptionStore};
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

use crate::{
    error::StoreError,
    types::{Endpoint, Reminder, ReminderId, Subscription, UserId},
};

/// Store of scheduled reminders.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Load unsent reminders whose fire time is at or before `now`, capped
    /// at `limit`.
    async fn due_before(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Reminder>, StoreError>;

    /// Flip the sent flag to true for every reminder in `ids`.
    ///
    /// Idempotent: unknown or already-sent identifiers are ignored.
    async fn mark_sent(&self, ids: &HashSet<ReminderId>) -> Result<(), StoreError>;

    /// Delete sent reminders whose fire time is at or before `cutoff`,
    /// returning how many were removed.
    async fn purge_sent_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Store of push subscriptions.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Load every subscription registered for the given recipients, in one
    /// query. May return duplicate endpoint rows; the resolver deduplicates.
    async fn for_users(&self, users: &HashSet<UserId>) -> Result<Vec<Subscription>, StoreError>;

    /// Delete every subscription whose endpoint is in `endpoints`,
    /// returning how many were removed.
    ///
    /// Idempotent: unknown endpoints are ignored.
    async fn delete_endpoints(&self, endpoints: &HashSet<Endpoint>) -> Result<u64, StoreError>;
}
