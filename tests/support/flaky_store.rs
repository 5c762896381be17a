//! Fault-injecting reminder store for failure-path tests
#![allow(dead_code)] // Test utility module - not all methods used in every test

use std::{
    collections::HashSet,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use chime::{
    Reminder, ReminderId, StoreError,
    store::{MemoryReminderStore, ReminderStore},
};
use chrono::{DateTime, Utc};

/// Wraps a [`MemoryReminderStore`] and rejects individual operations on
/// demand, leaving the underlying state untouched for later assertions.
#[derive(Default)]
pub struct FlakyReminderStore {
    pub inner: MemoryReminderStore,
    fail_due: AtomicBool,
    fail_mark: AtomicBool,
    fail_purge: AtomicBool,
}

impl FlakyReminderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_due_queries(&self, fail: bool) {
        self.fail_due.store(fail, Ordering::SeqCst);
    }

    pub fn fail_mark_sent(&self, fail: bool) {
        self.fail_mark.store(fail, Ordering::SeqCst);
    }

    pub fn fail_purges(&self, fail: bool) {
        self.fail_purge.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReminderStore for FlakyReminderStore {
    async fn due_before(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Reminder>, StoreError> {
        if self.fail_due.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("store unreachable".to_string()));
        }
        self.inner.due_before(now, limit).await
    }

    async fn mark_sent(&self, ids: &HashSet<ReminderId>) -> Result<(), StoreError> {
        if self.fail_mark.load(Ordering::SeqCst) {
            return Err(StoreError::Query("update refused".to_string()));
        }
        self.inner.mark_sent(ids).await
    }

    async fn purge_sent_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        if self.fail_purge.load(Ordering::SeqCst) {
            return Err(StoreError::Query("delete refused".to_string()));
        }
        self.inner.purge_sent_before(cutoff).await
    }
}
