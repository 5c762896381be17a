//! In-memory store implementations
//!
//! Backed by `RwLock`-protected maps. Primarily intended for tests and
//! local development runs; durable deployments use the `postgres` backend.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::StoreError,
    store::{ReminderStore, SubscriptionStore},
    types::{Endpoint, Reminder, ReminderId, Subscription, UserId},
};

/// In-memory reminder store
#[derive(Debug, Clone, Default)]
pub struct MemoryReminderStore {
    reminders: Arc<RwLock<HashMap<ReminderId, Reminder>>>,
}

impl MemoryReminderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a reminder.
    pub fn insert(&self, reminder: Reminder) {
        self.reminders
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(reminder.id.clone(), reminder);
    }

    /// Fetch a reminder by identifier.
    #[must_use]
    pub fn get(&self, id: &ReminderId) -> Option<Reminder> {
        self.reminders
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Number of reminders currently stored, sent or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reminders
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReminderStore for MemoryReminderStore {
    async fn due_before(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Reminder>, StoreError> {
        let mut due: Vec<Reminder> = self
            .reminders
            .read()?
            .values()
            .filter(|r| r.is_due(now))
            .cloned()
            .collect();

        // Oldest first, so the batch cap drops the newest reminders
        due.sort_by(|a, b| a.fire_at.cmp(&b.fire_at).then_with(|| a.id.cmp(&b.id)));
        due.truncate(limit);

        Ok(due)
    }

    async fn mark_sent(&self, ids: &HashSet<ReminderId>) -> Result<(), StoreError> {
        let mut reminders = self.reminders.write()?;

        for id in ids {
            if let Some(reminder) = reminders.get_mut(id) {
                reminder.sent = true;
            }
        }

        Ok(())
    }

    async fn purge_sent_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut reminders = self.reminders.write()?;
        let before = reminders.len();

        reminders.retain(|_, r| !(r.sent && r.fire_at <= cutoff));

        Ok((before - reminders.len()) as u64)
    }
}

/// In-memory subscription store
///
/// Rows are kept as a plain list, so duplicate endpoint rows survive the
/// way they can in a real store; deduplication is the resolver's job.
#[derive(Debug, Clone, Default)]
pub struct MemorySubscriptionStore {
    subscriptions: Arc<RwLock<Vec<Subscription>>>,
}

impl MemorySubscriptionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a subscription row, duplicates included.
    pub fn insert(&self, subscription: Subscription) {
        self.subscriptions
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(subscription);
    }

    /// Number of subscription rows currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any row carries the given endpoint.
    #[must_use]
    pub fn contains_endpoint(&self, endpoint: &Endpoint) -> bool {
        self.subscriptions
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .any(|s| &s.endpoint == endpoint)
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn for_users(&self, users: &HashSet<UserId>) -> Result<Vec<Subscription>, StoreError> {
        Ok(self
            .subscriptions
            .read()?
            .iter()
            .filter(|s| users.contains(&s.user_id))
            .cloned()
            .collect())
    }

    async fn delete_endpoints(&self, endpoints: &HashSet<Endpoint>) -> Result<u64, StoreError> {
        let mut subscriptions = self.subscriptions.write()?;
        let before = subscriptions.len();

        subscriptions.retain(|s| !endpoints.contains(&s.endpoint));

        Ok((before - subscriptions.len()) as u64)
    }
}
