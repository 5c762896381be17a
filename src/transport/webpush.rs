//! Web Push transport backed by the `web-push` crate
//!
//! Payloads are encrypted per RFC 8291 (aes128gcm) and authenticated with a
//! VAPID signature built from the configured subject and private key. The
//! crate owns the wire protocol; this module only maps its errors onto the
//! typed status codes the classifier consumes.

use async_trait::async_trait;
use web_push::{
    ContentEncoding, IsahcWebPushClient, SubscriptionInfo, URL_SAFE_NO_PAD,
    VapidSignatureBuilder, WebPushClient, WebPushError, WebPushMessageBuilder,
};

use crate::{
    error::TransportError,
    transport::PushTransport,
    types::{PushPayload, Subscription},
};

/// Production push transport speaking the Web Push protocol.
pub struct WebPushTransport {
    client: IsahcWebPushClient,
    subject: String,
    vapid_private_key: String,
}

impl WebPushTransport {
    /// Create a transport from VAPID credentials.
    ///
    /// `subject` is the contact claim (`mailto:` or `https:` URI) push
    /// services may use to reach the operator; `vapid_private_key` is the
    /// url-safe base64 private key matching the public key the clients
    /// subscribed with.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying HTTP client cannot be built.
    pub fn new(
        subject: impl Into<String>,
        vapid_private_key: impl Into<String>,
    ) -> Result<Self, TransportError> {
        let client = IsahcWebPushClient::new()
            .map_err(|e| TransportError::Other(format!("failed to build push client: {e}")))?;

        Ok(Self {
            client,
            subject: subject.into(),
            vapid_private_key: vapid_private_key.into(),
        })
    }
}

#[async_trait]
impl PushTransport for WebPushTransport {
    async fn send(
        &self,
        target: &Subscription,
        payload: &PushPayload,
    ) -> Result<(), TransportError> {
        let info = SubscriptionInfo::new(
            target.endpoint.as_str(),
            target.p256dh.as_str(),
            target.auth.as_str(),
        );

        let mut signature =
            VapidSignatureBuilder::from_base64(&self.vapid_private_key, URL_SAFE_NO_PAD, &info)
                .map_err(TransportError::from)?;
        signature.add_claim("sub", self.subject.as_str());

        let body = serde_json::to_vec(payload)
            .map_err(|e| TransportError::Other(format!("failed to encode payload: {e}")))?;

        let mut message = WebPushMessageBuilder::new(&info);
        message.set_payload(ContentEncoding::Aes128Gcm, &body);
        message.set_vapid_signature(signature.build().map_err(TransportError::from)?);

        self.client
            .send(message.build().map_err(TransportError::from)?)
            .await
            .map_err(TransportError::from)
    }
}

/// Map the crate's error onto the status code the push service answered
/// with, where it reported one.
impl From<WebPushError> for TransportError {
    fn from(error: WebPushError) -> Self {
        let status = match &error {
            WebPushError::BadRequest { .. } => Some(400),
            WebPushError::Unauthorized { .. } => Some(401),
            WebPushError::EndpointNotFound { .. } => Some(404),
            WebPushError::EndpointNotValid { .. } => Some(410),
            WebPushError::PayloadTooLarge { .. } => Some(413),
            _ => None,
        };

        match status {
            Some(status) => Self::Status {
                status,
                message: error.to_string(),
            },
            None => Self::Other(error.to_string()),
        }
    }
}
