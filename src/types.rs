//! Core domain types shared across the dispatch cycle

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Click-through destination used when a reminder carries no url of its own.
pub const DEFAULT_CLICK_URL: &str = "/";

/// Identifier for a scheduled reminder
///
/// Reminders are created externally; their identifiers are opaque here and
/// only required to be unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderId(String);

impl ReminderId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReminderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for a reminder's recipient
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Push endpoint URI for one registered device or browser
///
/// Acts as the subscription's unique key within a recipient: within one
/// dispatch cycle at most one delivery is attempted per distinct endpoint
/// per recipient.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Endpoint(String);

impl Endpoint {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self(endpoint.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A scheduled reminder awaiting delivery
///
/// The `sent` flag is monotonic: it flips false to true when at least one
/// delivery attempt for the reminder succeeds, and never reverts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub user_id: UserId,
    pub title: String,
    pub body: String,
    /// Optional click-through url; [`DEFAULT_CLICK_URL`] when absent
    pub url: Option<String>,
    /// When the reminder becomes due
    pub fire_at: DateTime<Utc>,
    pub sent: bool,
}

impl Reminder {
    /// A reminder is eligible for dispatch iff it is unsent and its fire
    /// time has passed.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.sent && self.fire_at <= now
    }

    /// Render the notification payload for this reminder.
    ///
    /// Rendered once per reminder, shared across every target attempt.
    #[must_use]
    pub fn payload(&self) -> PushPayload {
        PushPayload {
            title: self.title.clone(),
            body: self.body.clone(),
            url: self
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_CLICK_URL.to_string()),
        }
    }
}

/// One registered push subscription for a recipient
///
/// Endpoint plus the key material the transport needs to encrypt payloads.
/// Created externally; deleted only when a delivery attempt reports the
/// endpoint permanently gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: UserId,
    pub endpoint: Endpoint,
    pub p256dh: String,
    pub auth: String,
}

/// The JSON payload delivered to a push endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub url: String,
}

/// Counters for one dispatch cycle, kept for observability only
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Due reminders considered this cycle
    pub considered: usize,
    /// Delivery attempts made across all targets
    pub attempted: usize,
    /// Attempts that succeeded
    pub delivered: usize,
    /// Wall-clock duration of the cycle
    pub elapsed: Duration,
}

impl std::fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "reminders: {}, targets: {}, sent: {}, duration: {}ms",
            self.considered,
            self.attempted,
            self.delivered,
            self.elapsed.as_millis()
        )
    }
}
