//! Conversation engine: per-chat state machine and intent dispatch.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use paypilot_core::{
    AudioClip, ChatKey, DraftInvoice, InboundEvent, Intent, IntentClassifier, Invoice,
    InvoiceFilter, InvoiceRequest, InvoiceStatus, InvoiceStore, Media, OutboundContent,
    PayPilotConfig, PayPilotError, RenderedDocument, Renderer, Transcriber, Transport,
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::confirmation::{classify_reply, Reply};
use crate::error::EngineError;
use crate::format;
use crate::messenger::Messenger;
use crate::session::{ConversationSession, SessionState, SessionTable};

/// Engine tunables.
#[derive(Clone, Debug)]
pub struct EngineSettings {
    pub operator: ChatKey,
    pub grace: Duration,
    pub list_limit: usize,
    pub currency_symbol: String,
    pub default_due_days: i64,
}

impl EngineSettings {
    pub fn from_config(config: &PayPilotConfig) -> Self {
        Self {
            operator: ChatKey::new(config.operator.chat_key.clone()),
            grace: Duration::from_millis(config.engine.grace_ms),
            list_limit: config.engine.list_limit,
            currency_symbol: config.engine.currency_symbol.clone(),
            default_due_days: config.engine.default_due_days,
        }
    }
}

/// The collaborators the engine drives.
pub struct Collaborators {
    pub classifier: Arc<dyn IntentClassifier>,
    pub transcriber: Arc<dyn Transcriber>,
    pub store: Arc<dyn InvoiceStore>,
    pub renderer: Arc<dyn Renderer>,
    pub transport: Arc<dyn Transport>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    NotOperator,
    Echo,
    EmptyBody,
    UnsupportedMedia,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum EventOutcome {
    Processed,
    Dropped(DropReason),
}

pub struct ConversationEngine {
    settings: EngineSettings,
    classifier: Arc<dyn IntentClassifier>,
    transcriber: Arc<dyn Transcriber>,
    store: Arc<dyn InvoiceStore>,
    renderer: Arc<dyn Renderer>,
    messenger: Messenger,
    sessions: SessionTable,
}

impl ConversationEngine {
    pub fn new(settings: EngineSettings, collaborators: Collaborators) -> Self {
        let messenger = Messenger::new(collaborators.transport, settings.grace);
        Self {
            settings,
            classifier: collaborators.classifier,
            transcriber: collaborators.transcriber,
            store: collaborators.store,
            renderer: collaborators.renderer,
            messenger,
            sessions: SessionTable::new(),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Shared with the reminder scheduler so both honour the same guard.
    pub fn messenger(&self) -> &Messenger {
        &self.messenger
    }

    pub fn store(&self) -> &Arc<dyn InvoiceStore> {
        &self.store
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    fn drop_reason(&self, event: &InboundEvent) -> Option<DropReason> {
        if event.chat_key != self.settings.operator {
            return Some(DropReason::NotOperator);
        }
        if self.messenger.guard().is_guarded(&event.chat_key) {
            return Some(DropReason::Echo);
        }
        if event.body.trim().is_empty() && !event.is_voice() {
            return Some(if event.has_non_voice_media() {
                DropReason::UnsupportedMedia
            } else {
                DropReason::EmptyBody
            });
        }
        None
    }

    /// Process one inbound event to completion.
    ///
    /// Events for the same chat are serialized; the chat's session lock is
    /// held until every reply for this event has been sent.
    pub async fn handle_event(&self, event: InboundEvent) -> EventOutcome {
        if let Some(reason) = self.drop_reason(&event) {
            debug!(chat = %event.chat_key, reason = ?reason, "Inbound event dropped");
            return EventOutcome::Dropped(reason);
        }

        let chat = event.chat_key.clone();
        let session = self.sessions.session(&chat);
        let mut session = session.lock().await;

        let text = match event.media {
            Some(Media::Voice { data, mime_type }) => {
                match self.transcribe_voice(&chat, &data, &mime_type).await {
                    Some(transcript) => transcript,
                    None => return EventOutcome::Processed,
                }
            }
            _ => event.body.trim().to_string(),
        };

        let result = if session.is_awaiting_confirmation() {
            self.handle_confirmation(&mut session, &chat, &text).await
        } else {
            self.handle_intent(&mut session, &chat, &text).await
        };
        if let Err(e) = result {
            self.reply(&chat, e.user_message()).await;
        }
        EventOutcome::Processed
    }

    /// Returns the transcript, or `None` once the operator has been told the
    /// voice note could not be used.
    async fn transcribe_voice(&self, chat: &ChatKey, data: &[u8], mime_type: &str) -> Option<String> {
        self.reply(chat, format::VOICE_ACK).await;

        let clip = match AudioClip::stage(data, mime_type) {
            Ok(clip) => clip,
            Err(e) => {
                error!(chat = %chat, error = %e, "Failed to stage voice note");
                self.reply(chat, format::VOICE_FAILED).await;
                return None;
            }
        };
        let transcript = self.transcriber.transcribe(&clip).await;
        drop(clip);

        let transcript = transcript.trim();
        if transcript.is_empty() {
            warn!(chat = %chat, "Voice note produced no transcript");
            self.reply(chat, format::VOICE_FAILED).await;
            return None;
        }
        info!(chat = %chat, chars = transcript.len(), "Voice note transcribed");
        self.reply(chat, format::transcript_echo(transcript)).await;
        Some(transcript.to_string())
    }

    async fn handle_confirmation(
        &self,
        session: &mut ConversationSession,
        chat: &ChatKey,
        text: &str,
    ) -> Result<(), EngineError> {
        match classify_reply(text) {
            Reply::Affirmative => {
                let Some(draft) = session.take_draft() else {
                    return Ok(());
                };
                self.confirm_draft(chat, draft).await
            }
            Reply::Negative => {
                session.clear();
                info!(chat = %chat, "Draft cancelled");
                self.reply(chat, format::CANCELLED).await;
                Ok(())
            }
            Reply::Unrecognized => {
                let count = session.record_reprompt();
                debug!(chat = %chat, reprompts = count, "Unrecognized confirmation reply");
                self.reply(chat, format::REPROMPT).await;
                Ok(())
            }
        }
    }

    /// Promote a confirmed draft: create, render, deliver.
    async fn confirm_draft(&self, chat: &ChatKey, draft: DraftInvoice) -> Result<(), EngineError> {
        let invoice = self.store.create(&draft, chat).await.map_err(|e| {
            error!(chat = %chat, error = %e, "Failed to create invoice");
            EngineError::Provider(format::SAVE_FAILED.to_string())
        })?;
        info!(chat = %chat, id = %invoice.id, amount = invoice.amount, "Invoice created");

        let document = self.renderer.render(&invoice).await.map_err(|e| {
            error!(id = %invoice.id, error = %e, "Failed to render invoice");
            EngineError::Provider(format!(
                "Invoice {} was saved but its document could not be generated.",
                format::display_id(&invoice.id)
            ))
        })?;

        // The customer is only billed once the operator holds the document.
        let undelivered = |e: PayPilotError| {
            error!(id = %invoice.id, error = %e, "Invoice not delivered to operator");
            EngineError::Provider(format!(
                "Invoice {} was saved but could not be sent to you.",
                format::display_id(&invoice.id)
            ))
        };
        self.messenger
            .send(chat, document.as_content(Some(format::document_caption(&invoice))))
            .await
            .map_err(undelivered)?;
        self.messenger
            .send(
                chat,
                OutboundContent::text(format::created_summary(
                    &invoice,
                    &self.settings.currency_symbol,
                )),
            )
            .await
            .map_err(undelivered)?;

        match self.deliver_to_customer(&invoice, &document).await {
            Ok(customer) => {
                info!(id = %invoice.id, to = %customer, "Invoice delivered to customer");
                self.reply(chat, format!("📤 Sent to {}.", invoice.customer_name))
                    .await;
                Ok(())
            }
            Err(e) => {
                warn!(id = %invoice.id, error = %e, "Customer delivery incomplete");
                Err(e)
            }
        }
    }

    async fn deliver_to_customer(
        &self,
        invoice: &Invoice,
        document: &RenderedDocument,
    ) -> Result<ChatKey, EngineError> {
        let contact = self
            .messenger
            .resolve_contact(&invoice.customer_name, invoice.customer_phone.as_deref())
            .await
            .ok()
            .flatten()
            .ok_or_else(|| {
                EngineError::PartialDelivery(format!(
                    "No chat found for {}; share the invoice manually.",
                    invoice.customer_name
                ))
            })?;

        let failed = || {
            EngineError::PartialDelivery(format!(
                "Invoice saved, but sending it to {} failed.",
                invoice.customer_name
            ))
        };
        self.messenger
            .send(&contact, document.as_content(None))
            .await
            .map_err(|_| failed())?;
        self.messenger
            .send(
                &contact,
                OutboundContent::text(format::customer_message(
                    invoice,
                    &self.settings.currency_symbol,
                )),
            )
            .await
            .map_err(|_| failed())?;
        Ok(contact)
    }

    async fn handle_intent(
        &self,
        session: &mut ConversationSession,
        chat: &ChatKey,
        text: &str,
    ) -> Result<(), EngineError> {
        let intent = self.classifier.classify(text).await;
        debug!(chat = %chat, intent = intent.name(), "Intent classified");

        match intent {
            Intent::CreateInvoice(request) => self.propose_draft(session, chat, &request).await,
            Intent::UpdatePayment { invoice_id } => {
                let id = invoice_id.ok_or_else(|| usage(format::PAID_USAGE))?;
                self.mark_paid(chat, &id).await
            }
            Intent::CheckStatus { invoice_id } => {
                let id = invoice_id.ok_or_else(|| usage(format::STATUS_USAGE))?;
                self.check_status(chat, &id).await
            }
            Intent::ListInvoices => self.list_invoices(chat).await,
            Intent::Unknown => {
                self.reply(chat, format::HELP_MESSAGE).await;
                Ok(())
            }
        }
    }

    async fn propose_draft(
        &self,
        session: &mut ConversationSession,
        chat: &ChatKey,
        request: &InvoiceRequest,
    ) -> Result<(), EngineError> {
        let draft = DraftInvoice::from_request(request, Utc::now(), self.settings.default_due_days);
        let summary = format::draft_summary(&draft, &self.settings.currency_symbol);
        info!(chat = %chat, customer = %draft.customer_name, amount = draft.amount, "Draft proposed");
        session.await_confirmation(draft);
        self.reply(chat, summary).await;
        Ok(())
    }

    async fn mark_paid(&self, chat: &ChatKey, id: &str) -> Result<(), EngineError> {
        match self.store.update_status(id, InvoiceStatus::Paid).await {
            Ok(Some(invoice)) => {
                info!(chat = %chat, id = %invoice.id, "Invoice marked paid");
                self.reply(chat, format::paid_confirmation(&invoice, &self.settings.currency_symbol))
                    .await;
                Ok(())
            }
            Ok(None) => Err(EngineError::NotFound(format::display_id(id))),
            Err(PayPilotError::InvalidTransition { from, .. }) => {
                let message = if from == InvoiceStatus::Paid {
                    format!("Invoice {} is already paid.", format::display_id(id))
                } else {
                    format!(
                        "Invoice {} is {} and cannot be marked paid.",
                        format::display_id(id),
                        from
                    )
                };
                Err(EngineError::Validation(message))
            }
            Err(e) => {
                warn!(chat = %chat, id = %id, error = %e, "Mark paid failed");
                Err(EngineError::NotFound(format::display_id(id)))
            }
        }
    }

    async fn check_status(&self, chat: &ChatKey, id: &str) -> Result<(), EngineError> {
        let invoice = match self.store.get(id).await {
            Ok(Some(invoice)) => invoice,
            Ok(None) => return Err(EngineError::NotFound(format::display_id(id))),
            Err(e) => {
                warn!(chat = %chat, id = %id, error = %e, "Status lookup failed");
                return Err(EngineError::NotFound(format::display_id(id)));
            }
        };
        self.reply(chat, format::status_reply(&invoice, &self.settings.currency_symbol))
            .await;
        Ok(())
    }

    async fn list_invoices(&self, chat: &ChatKey) -> Result<(), EngineError> {
        let filter = InvoiceFilter {
            owner: Some(chat.clone()),
            ..Default::default()
        };
        let invoices = self.store.list(&filter).await.map_err(|e| {
            error!(chat = %chat, error = %e, "Failed to list invoices");
            EngineError::Provider("Could not load your invoices. Please try again.".to_string())
        })?;
        self.reply(
            chat,
            format::list_reply(&invoices, self.settings.list_limit, &self.settings.currency_symbol),
        )
        .await;
        Ok(())
    }

    async fn reply(&self, chat: &ChatKey, text: impl Into<String>) {
        self.send_logged(chat, OutboundContent::text(text)).await;
    }

    async fn send_logged(&self, chat: &ChatKey, content: OutboundContent) {
        if let Err(e) = self.messenger.send(chat, content).await {
            error!(chat = %chat, error = %e, "Reply to operator not delivered");
        }
    }

    /// Current session state for `chat`, if any.
    pub async fn session_state(&self, chat: &ChatKey) -> Option<SessionState> {
        self.sessions.state(chat).await
    }
}

fn usage(text: &str) -> EngineError {
    EngineError::Validation(text.to_string())
}
