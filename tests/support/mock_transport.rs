//! Mock push transport for testing dispatch scenarios
//!
//! This module provides a configurable mock transport that can:
#![allow(dead_code)] // Test utility module - not all methods used in every test
//! - Script per-endpoint outcomes (success, status-coded failure, network failure)
//! - Track every send for verification
//!
//! # Example
//!
//! ```rust,no_run
//! use support::mock_transport::MockPushTransport;
//!
//! let transport = MockPushTransport::new()
//!     .with_status_failure("https://push.example/dead", 410, "Gone");
//!
//! // Endpoints without a scripted failure succeed.
//! ```

use std::{
    collections::HashMap,
    sync::Mutex,
};

use async_trait::async_trait;
use chime::{Endpoint, PushPayload, Subscription, TransportError, transport::PushTransport};

/// A recorded delivery attempt.
#[derive(Debug, Clone)]
pub struct RecordedSend {
    pub endpoint: Endpoint,
    pub payload: PushPayload,
}

/// Scriptable push transport: endpoints fail as configured, everything else
/// succeeds, and every attempt is recorded.
#[derive(Default)]
pub struct MockPushTransport {
    failures: HashMap<Endpoint, TransportError>,
    sends: Mutex<Vec<RecordedSend>>,
}

impl MockPushTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a status-coded failure for an endpoint.
    #[must_use]
    pub fn with_status_failure(mut self, endpoint: &str, status: u16, message: &str) -> Self {
        self.failures.insert(
            Endpoint::new(endpoint),
            TransportError::Status {
                status,
                message: message.to_string(),
            },
        );
        self
    }

    /// Script a failure without a status code (network-level) for an endpoint.
    #[must_use]
    pub fn with_network_failure(mut self, endpoint: &str, message: &str) -> Self {
        self.failures
            .insert(Endpoint::new(endpoint), TransportError::Other(message.to_string()));
        self
    }

    /// Every attempt made so far, in completion order.
    pub fn sends(&self) -> Vec<RecordedSend> {
        self.sends.lock().expect("sends lock").clone()
    }

    /// Total number of attempts made.
    pub fn send_count(&self) -> usize {
        self.sends.lock().expect("sends lock").len()
    }

    /// Number of attempts made against one endpoint.
    pub fn sends_to(&self, endpoint: &str) -> usize {
        let endpoint = Endpoint::new(endpoint);
        self.sends
            .lock()
            .expect("sends lock")
            .iter()
            .filter(|s| s.endpoint == endpoint)
            .count()
    }
}

#[async_trait]
impl PushTransport for MockPushTransport {
    async fn send(
        &self,
        target: &Subscription,
        payload: &PushPayload,
    ) -> Result<(), TransportError> {
        self.sends.lock().expect("sends lock").push(RecordedSend {
            endpoint: target.endpoint.clone(),
            payload: payload.clone(),
        });

        match self.failures.get(&target.endpoint) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}
