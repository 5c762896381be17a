//! Scheduled web-push reminder dispatcher
//!
//! This crate provides functionality to:
//! - Select due reminders from a backing store, capped per cycle
//! - Resolve every registered push subscription for their recipients
//! - Fan deliveries out concurrently across recipients and devices
//! - Classify failures and prune subscriptions that are permanently gone
//! - Mark delivered reminders sent and sweep old ones out of retention

pub mod config;
mod dispatch;
mod error;
pub mod store;
pub mod transport;
mod types;

// Re-export the cycle driver
pub use dispatch::Dispatcher;
// Re-export configuration types
pub use config::{Config, ConfigError, DispatchConfig, TransportConfig};
// Re-export error types
pub use error::{DispatchError, FailureKind, StoreError, TransportError};
// Re-export core types
pub use types::{
    CycleSummary, DEFAULT_CLICK_URL, Endpoint, PushPayload, Reminder, ReminderId, Subscription,
    UserId,
};
