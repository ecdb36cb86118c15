//! Capability traits for the collaborators the engine and scheduler drive.
//!
//! Every external system is reached through one of these traits so that the
//! conversation engine can be exercised against in-process fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    AudioClip, ChatKey, DeliveryReceipt, DraftInvoice, Intent, Invoice, InvoiceFilter,
    InvoiceStatus, OutboundContent, RenderedDocument,
};

/// Turns free-form text into a typed intent.
///
/// Never fails: implementations degrade to [`Intent::Unknown`].
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Intent;
}

/// Turns staged voice audio into text.
///
/// Never fails: an empty string means no usable transcript.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, clip: &AudioClip) -> String;
}

/// Persistent invoice storage.
///
/// Not-found is `Ok(None)`; `Err` is reserved for storage failures and
/// rejected status transitions.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Persist a new `PENDING` invoice owned by `owner`.
    async fn create(&self, draft: &DraftInvoice, owner: &ChatKey) -> Result<Invoice>;

    /// Fetch by id, matched case-insensitively.
    async fn get(&self, id: &str) -> Result<Option<Invoice>>;

    /// List matching invoices, newest first.
    async fn list(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>>;

    /// Validate and apply a status change atomically.
    async fn update_status(&self, id: &str, status: InvoiceStatus) -> Result<Option<Invoice>>;
}

/// Renders an invoice into a shareable document.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, invoice: &Invoice) -> Result<RenderedDocument>;
}

/// Messaging channel used for all outbound traffic.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, to: &ChatKey, content: OutboundContent) -> Result<DeliveryReceipt>;

    /// Find the chat of a customer by phone or name.
    async fn resolve_contact(&self, name: &str, phone: Option<&str>) -> Result<Option<ChatKey>>;
}
