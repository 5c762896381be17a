//! PostgreSQL store adapter
//!
//! One pooled connection serves both store traits. The schema is
//! bootstrapped on connect, so a fresh database is usable immediately.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    Row,
    postgres::{PgPool, PgPoolOptions},
};

use crate::{
    error::StoreError,
    store::{ReminderStore, SubscriptionStore},
    types::{Endpoint, Reminder, ReminderId, Subscription, UserId},
};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// PostgreSQL-backed reminder and subscription store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to PostgreSQL and initialize the required schema.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` when the pool cannot be established
    /// and `StoreError::Query` when schema bootstrap fails.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        Self::connect_with_options(
            database_url,
            DEFAULT_MAX_CONNECTIONS,
            DEFAULT_CONNECT_TIMEOUT_SECS,
        )
        .await
    }

    /// Connect with explicit pool parameters.
    ///
    /// # Errors
    ///
    /// See [`PgStore::connect`].
    pub async fn connect_with_options(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.init_schema().await?;

        Ok(store)
    }

    /// Create an adapter from an existing pool.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Query` when schema bootstrap fails.
    pub async fn from_pool(pool: PgPool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        let ddl = [
            r"
            CREATE TABLE IF NOT EXISTS reminders (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                url TEXT,
                fire_at TIMESTAMPTZ NOT NULL,
                sent BOOLEAN NOT NULL DEFAULT FALSE
            )
            ",
            r"
            CREATE INDEX IF NOT EXISTS reminders_due_idx
                ON reminders (sent, fire_at)
            ",
            r"
            CREATE TABLE IF NOT EXISTS push_subscriptions (
                user_id TEXT NOT NULL,
                endpoint TEXT NOT NULL,
                p256dh TEXT NOT NULL,
                auth TEXT NOT NULL,
                PRIMARY KEY (user_id, endpoint)
            )
            ",
        ];

        for stmt in ddl {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Query(e.to_string()))?;
        }

        Ok(())
    }
}

fn reminder_from_row(row: &sqlx::postgres::PgRow) -> Result<Reminder, StoreError> {
    let map = |e: sqlx::Error| StoreError::Query(e.to_string());

    Ok(Reminder {
        id: ReminderId::new(row.try_get::<String, _>("id").map_err(map)?),
        user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(map)?),
        title: row.try_get("title").map_err(map)?,
        body: row.try_get("body").map_err(map)?,
        url: row.try_get("url").map_err(map)?,
        fire_at: row.try_get("fire_at").map_err(map)?,
        sent: row.try_get("sent").map_err(map)?,
    })
}

#[async_trait]
impl ReminderStore for PgStore {
    async fn due_before(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Reminder>, StoreError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, title, body, url, fire_at, sent
              FROM reminders
             WHERE sent = FALSE
               AND fire_at <= $1
             ORDER BY fire_at
             LIMIT $2
            ",
        )
        .bind(now)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        rows.iter().map(reminder_from_row).collect()
    }

    async fn mark_sent(&self, ids: &HashSet<ReminderId>) -> Result<(), StoreError> {
        let ids: Vec<String> = ids.iter().map(|id| id.as_str().to_owned()).collect();

        sqlx::query("UPDATE reminders SET sent = TRUE WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(())
    }

    async fn purge_sent_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM reminders WHERE sent = TRUE AND fire_at <= $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SubscriptionStore for PgStore {
    async fn for_users(&self, users: &HashSet<UserId>) -> Result<Vec<Subscription>, StoreError> {
        let users: Vec<String> = users.iter().map(|u| u.as_str().to_owned()).collect();

        let rows = sqlx::query(
            r"
            SELECT user_id, endpoint, p256dh, auth
              FROM push_subscriptions
             WHERE user_id = ANY($1)
            ",
        )
        .bind(&users)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        let map = |e: sqlx::Error| StoreError::Query(e.to_string());

        rows.iter()
            .map(|row| {
                Ok(Subscription {
                    user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(map)?),
                    endpoint: Endpoint::new(row.try_get::<String, _>("endpoint").map_err(map)?),
                    p256dh: row.try_get("p256dh").map_err(map)?,
                    auth: row.try_get("auth").map_err(map)?,
                })
            })
            .collect()
    }

    async fn delete_endpoints(&self, endpoints: &HashSet<Endpoint>) -> Result<u64, StoreError> {
        let endpoints: Vec<String> = endpoints.iter().map(|e| e.as_str().to_owned()).collect();

        let result = sqlx::query("DELETE FROM push_subscriptions WHERE endpoint = ANY($1)")
            .bind(&endpoints)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
