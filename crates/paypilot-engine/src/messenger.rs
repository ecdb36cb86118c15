//! Outbound dispatch shared by the conversation engine and the scheduler.

use std::sync::Arc;
use std::time::Duration;

use paypilot_core::{ChatKey, DeliveryReceipt, OutboundContent, PayPilotError, Transport};
use tracing::{debug, warn};

use crate::guard::OutboundGuard;

/// Sends through the transport while holding the recipient's outbound guard.
#[derive(Clone)]
pub struct Messenger {
    transport: Arc<dyn Transport>,
    guard: Arc<OutboundGuard>,
    grace: Duration,
}

impl Messenger {
    pub fn new(transport: Arc<dyn Transport>, grace: Duration) -> Self {
        Self {
            transport,
            guard: Arc::new(OutboundGuard::new()),
            grace,
        }
    }

    pub fn guard(&self) -> &Arc<OutboundGuard> {
        &self.guard
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Send one message. The guard for `to` stays raised until `grace`
    /// after the transport call returns.
    pub async fn send(
        &self,
        to: &ChatKey,
        content: OutboundContent,
    ) -> Result<DeliveryReceipt, PayPilotError> {
        let _ticket = self.guard.ticket(to, self.grace);
        let result = self.transport.send(to, content).await;
        match &result {
            Ok(receipt) => debug!(to = %to, message_id = %receipt.message_id, "Message sent"),
            Err(e) => warn!(to = %to, error = %e, "Message send failed"),
        }
        result
    }

    /// Send a text message, logging instead of returning a failure.
    pub async fn notify(&self, to: &ChatKey, text: impl Into<String>) -> bool {
        self.send(to, OutboundContent::text(text)).await.is_ok()
    }

    pub async fn resolve_contact(
        &self,
        name: &str,
        phone: Option<&str>,
    ) -> Result<Option<ChatKey>, PayPilotError> {
        self.transport.resolve_contact(name, phone).await
    }
}
