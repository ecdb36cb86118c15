//! In-process fakes for the engine's collaborators.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paypilot_core::{
    AudioClip, ChatKey, DeliveryReceipt, DraftInvoice, Invoice, InvoiceFilter, InvoiceStatus,
    InvoiceStore, OutboundContent, PayPilotError, RenderedDocument, Renderer, Transcriber,
    Transport,
};
use paypilot_engine::{Collaborators, ConversationEngine, EngineSettings};
use paypilot_intent::ClassifierChain;
use paypilot_storage::MemoryInvoiceStore;

pub const OPERATOR: &str = "operator@chat";
pub const GRACE: Duration = Duration::from_secs(3);

#[derive(Clone, Debug, PartialEq)]
pub enum Sent {
    Text(String),
    Document {
        file_name: String,
        caption: Option<String>,
        existed: bool,
    },
}

/// Records every send; contacts and failures are configurable.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(ChatKey, Sent)>>,
    contacts: Mutex<HashMap<String, ChatKey>>,
    failing: Mutex<HashSet<ChatKey>>,
    lookup_error: AtomicBool,
}

impl RecordingTransport {
    pub fn add_contact(&self, name: &str, chat: &str) {
        self.contacts
            .lock()
            .unwrap()
            .insert(name.to_lowercase(), ChatKey::from(chat));
    }

    pub fn fail_sends_to(&self, chat: &str) {
        self.failing.lock().unwrap().insert(ChatKey::from(chat));
    }

    pub fn fail_lookups(&self) {
        self.lookup_error.store(true, Ordering::SeqCst);
    }

    pub fn all(&self) -> Vec<(ChatKey, Sent)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn to(&self, chat: &str) -> Vec<Sent> {
        let chat = ChatKey::from(chat);
        self.all()
            .into_iter()
            .filter(|(to, _)| *to == chat)
            .map(|(_, sent)| sent)
            .collect()
    }

    pub fn texts_to(&self, chat: &str) -> Vec<String> {
        self.to(chat)
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Text(text) => Some(text),
                Sent::Document { .. } => None,
            })
            .collect()
    }

    pub fn last_text_to(&self, chat: &str) -> String {
        self.texts_to(chat).pop().unwrap_or_default()
    }

    pub fn documents_to(&self, chat: &str) -> Vec<Sent> {
        self.to(chat)
            .into_iter()
            .filter(|sent| matches!(sent, Sent::Document { .. }))
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(
        &self,
        to: &ChatKey,
        content: OutboundContent,
    ) -> Result<DeliveryReceipt, PayPilotError> {
        let sent = match content {
            OutboundContent::Text(text) => Sent::Text(text),
            OutboundContent::Document {
                path,
                file_name,
                caption,
                ..
            } => Sent::Document {
                file_name,
                caption,
                existed: path.exists(),
            },
        };
        if self.failing.lock().unwrap().contains(to) {
            return Err(PayPilotError::Transport("gateway unavailable".to_string()));
        }
        let mut log = self.sent.lock().unwrap();
        log.push((to.clone(), sent));
        Ok(DeliveryReceipt {
            message_id: format!("msg-{}", log.len()),
        })
    }

    async fn resolve_contact(
        &self,
        name: &str,
        _phone: Option<&str>,
    ) -> Result<Option<ChatKey>, PayPilotError> {
        if self.lookup_error.load(Ordering::SeqCst) {
            return Err(PayPilotError::Storage("directory offline".to_string()));
        }
        Ok(self.contacts.lock().unwrap().get(&name.to_lowercase()).cloned())
    }
}

/// Memory store with failure injection and an optional create delay.
#[derive(Default)]
pub struct FakeStore {
    inner: MemoryInvoiceStore,
    pub creates: AtomicUsize,
    fail_create: AtomicBool,
    fail_reads: AtomicBool,
    fail_update_ids: Mutex<HashSet<String>>,
    create_delay: Mutex<Option<Duration>>,
}

impl FakeStore {
    pub fn fail_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn fail_update_for(&self, id: &str) {
        self.fail_update_ids.lock().unwrap().insert(id.to_string());
    }

    pub fn delay_create(&self, delay: Duration) {
        *self.create_delay.lock().unwrap() = Some(delay);
    }

    pub async fn seed(&self, name: &str, amount: f64, due_date: DateTime<Utc>, owner: &str) -> Invoice {
        let draft = DraftInvoice {
            customer_name: name.to_string(),
            customer_phone: None,
            amount,
            description: "services".to_string(),
            due_date,
        };
        self.inner.create(&draft, &ChatKey::from(owner)).await.unwrap()
    }

    pub async fn get_status(&self, id: &str) -> Option<InvoiceStatus> {
        self.inner.get(id).await.unwrap().map(|i| i.status)
    }

    pub async fn all(&self) -> Vec<Invoice> {
        self.inner.list(&InvoiceFilter::default()).await.unwrap()
    }
}

#[async_trait]
impl InvoiceStore for FakeStore {
    async fn create(&self, draft: &DraftInvoice, owner: &ChatKey) -> Result<Invoice, PayPilotError> {
        let delay = *self.create_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(PayPilotError::Storage("disk full".to_string()));
        }
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create(draft, owner).await
    }

    async fn get(&self, id: &str) -> Result<Option<Invoice>, PayPilotError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PayPilotError::Storage("connection lost".to_string()));
        }
        self.inner.get(id).await
    }

    async fn list(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, PayPilotError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PayPilotError::Storage("connection lost".to_string()));
        }
        self.inner.list(filter).await
    }

    async fn update_status(
        &self,
        id: &str,
        status: InvoiceStatus,
    ) -> Result<Option<Invoice>, PayPilotError> {
        if self.fail_update_ids.lock().unwrap().contains(id) {
            return Err(PayPilotError::Storage("write conflict".to_string()));
        }
        self.inner.update_status(id, status).await
    }
}

/// Writes a small temp file per invoice.
#[derive(Default)]
pub struct FakeRenderer {
    fail: AtomicBool,
}

impl FakeRenderer {
    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn render(&self, invoice: &Invoice) -> Result<RenderedDocument, PayPilotError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PayPilotError::Render("template missing".to_string()));
        }
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(invoice.id.as_bytes())?;
        Ok(RenderedDocument::new(
            file.into_temp_path(),
            format!("invoice-{}.html", invoice.id.to_uppercase()),
            "text/html".to_string(),
        ))
    }
}

/// Returns a fixed transcript and remembers the staged clip paths.
#[derive(Default)]
pub struct FakeTranscriber {
    transcript: Mutex<String>,
    pub clips: Mutex<Vec<(PathBuf, bool)>>,
}

impl FakeTranscriber {
    pub fn returning(&self, text: &str) {
        *self.transcript.lock().unwrap() = text.to_string();
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, clip: &AudioClip) -> String {
        let path = clip.path().to_path_buf();
        let existed = path.exists();
        self.clips.lock().unwrap().push((path, existed));
        self.transcript.lock().unwrap().clone()
    }
}

pub struct Harness {
    pub engine: Arc<ConversationEngine>,
    pub transport: Arc<RecordingTransport>,
    pub store: Arc<FakeStore>,
    pub renderer: Arc<FakeRenderer>,
    pub transcriber: Arc<FakeTranscriber>,
}

pub fn settings() -> EngineSettings {
    EngineSettings {
        operator: ChatKey::from(OPERATOR),
        grace: GRACE,
        list_limit: 10,
        currency_symbol: "₹".to_string(),
        default_due_days: 7,
    }
}

pub fn harness() -> Harness {
    harness_with(settings())
}

pub fn harness_with(settings: EngineSettings) -> Harness {
    let transport = Arc::new(RecordingTransport::default());
    let store = Arc::new(FakeStore::default());
    let renderer = Arc::new(FakeRenderer::default());
    let transcriber = Arc::new(FakeTranscriber::default());

    let engine = ConversationEngine::new(
        settings,
        Collaborators {
            classifier: Arc::new(ClassifierChain::default()),
            transcriber: transcriber.clone(),
            store: store.clone(),
            renderer: renderer.clone(),
            transport: transport.clone(),
        },
    );

    Harness {
        engine: Arc::new(engine),
        transport,
        store,
        renderer,
        transcriber,
    }
}

/// Let the guard's grace period lapse.
pub async fn past_grace() {
    tokio::time::sleep(GRACE + Duration::from_millis(100)).await;
}
