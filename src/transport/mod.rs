//! Push transport boundary
//!
//! A transport knows how to get one rendered payload to one registered
//! endpoint; everything else (encryption, signing, the wire protocol) is
//! its own concern. Failures come back as [`TransportError`], carrying the
//! provider's status code when one was received.

pub mod webpush;

use async_trait::async_trait;

pub use webpush::WebPushTransport;

use crate::{
    error::TransportError,
    types::{PushPayload, Subscription},
};

/// Capability to deliver one payload to one push endpoint.
///
/// Implementations are expected to bound each send with their own timeout;
/// the dispatcher never cancels an in-flight send.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Send `payload` to the device behind `target`.
    async fn send(
        &self,
        target: &Subscription,
        payload: &PushPayload,
    ) -> Result<(), TransportError>;
}
