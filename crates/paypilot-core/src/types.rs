use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::money::normalize_amount;

// =============================================================================
// Identifiers
// =============================================================================

/// Opaque identifier of a chat on the messaging channel.
///
/// The operator's own chat key doubles as the owner key that scopes
/// invoice queries.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatKey(pub String);

impl ChatKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChatKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// Invoice lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Draft,
    Pending,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "DRAFT",
            InvoiceStatus::Pending => "PENDING",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Overdue => "OVERDUE",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(InvoiceStatus::Draft),
            "PENDING" => Ok(InvoiceStatus::Pending),
            "PAID" => Ok(InvoiceStatus::Paid),
            "OVERDUE" => Ok(InvoiceStatus::Overdue),
            _ => Err(format!("Unknown invoice status: {}", s)),
        }
    }
}

/// Default customer name when none could be extracted.
pub const UNKNOWN_CUSTOMER: &str = "Unknown";

/// Default description when none could be extracted.
pub const DEFAULT_DESCRIPTION: &str = "Professional services";

/// An unconfirmed invoice proposal held inside a conversation session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DraftInvoice {
    pub customer_name: String,
    pub customer_phone: Option<String>,
    /// Currency units, rounded to two decimals by [`normalize_amount`].
    pub amount: f64,
    pub description: String,
    pub due_date: DateTime<Utc>,
}

impl DraftInvoice {
    /// Build a draft from extracted fields, applying defaults.
    ///
    /// Missing name and description fall back to fixed defaults, a missing
    /// due date to `now + default_due_days`. The amount is rounded to two
    /// decimals; negative, non-finite or out-of-range amounts become zero.
    pub fn from_request(request: &InvoiceRequest, now: DateTime<Utc>, default_due_days: i64) -> Self {
        let customer_name = request
            .customer_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_CUSTOMER)
            .to_string();
        let description = request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_DESCRIPTION)
            .to_string();
        let amount = request
            .amount
            .and_then(normalize_amount)
            .unwrap_or(0.0);

        Self {
            customer_name,
            customer_phone: request.customer_phone.as_deref().and_then(normalize_phone),
            amount,
            description,
            due_date: request
                .due_date
                .unwrap_or_else(|| now + Duration::days(default_due_days)),
        }
    }
}

/// A persisted invoice record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    /// Copied from the confirmed draft, so always two-decimal currency units.
    pub amount: f64,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub status: InvoiceStatus,
    pub owner_chat: ChatKey,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filter for invoice listing queries. All set fields must match.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub owner: Option<ChatKey>,
    /// Only invoices due strictly before this instant.
    pub due_before: Option<DateTime<Utc>>,
    /// Only invoices due at or after this instant.
    pub due_after: Option<DateTime<Utc>>,
}

impl InvoiceFilter {
    /// Returns true when the invoice satisfies every set criterion.
    pub fn matches(&self, invoice: &Invoice) -> bool {
        if let Some(status) = self.status {
            if invoice.status != status {
                return false;
            }
        }
        if let Some(ref owner) = self.owner {
            if &invoice.owner_chat != owner {
                return false;
            }
        }
        if let Some(before) = self.due_before {
            if invoice.due_date >= before {
                return false;
            }
        }
        if let Some(after) = self.due_after {
            if invoice.due_date < after {
                return false;
            }
        }
        true
    }
}

/// Normalize a phone number to digits with an optional leading `+`.
///
/// Returns `None` unless 10 to 15 digits remain.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if !(10..=15).contains(&digits.len()) {
        return None;
    }
    if trimmed.starts_with('+') {
        Some(format!("+{}", digits))
    } else {
        Some(digits)
    }
}

// =============================================================================
// Intents
// =============================================================================

/// Fields extracted for an invoice creation request. All optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRequest {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

/// A classified operator request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    CreateInvoice(InvoiceRequest),
    UpdatePayment { invoice_id: Option<String> },
    CheckStatus { invoice_id: Option<String> },
    ListInvoices,
    Unknown,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::CreateInvoice(_) => "create_invoice",
            Intent::UpdatePayment { .. } => "update_payment",
            Intent::CheckStatus { .. } => "check_status",
            Intent::ListInvoices => "list_invoices",
            Intent::Unknown => "unknown",
        }
    }
}

// =============================================================================
// Messaging
// =============================================================================

/// Media attached to an inbound message.
#[derive(Clone, Debug, PartialEq)]
pub enum Media {
    Voice { data: Vec<u8>, mime_type: String },
    Other { mime_type: String },
}

/// A message received from the messaging channel.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundEvent {
    pub chat_key: ChatKey,
    pub body: String,
    pub media: Option<Media>,
}

impl InboundEvent {
    pub fn text(chat_key: impl Into<ChatKey>, body: impl Into<String>) -> Self {
        Self {
            chat_key: chat_key.into(),
            body: body.into(),
            media: None,
        }
    }

    pub fn is_voice(&self) -> bool {
        matches!(self.media, Some(Media::Voice { .. }))
    }

    pub fn has_non_voice_media(&self) -> bool {
        matches!(self.media, Some(Media::Other { .. }))
    }
}

impl From<String> for ChatKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Content handed to the transport for delivery.
#[derive(Clone, Debug, PartialEq)]
pub enum OutboundContent {
    Text(String),
    Document {
        path: PathBuf,
        file_name: String,
        mime_type: String,
        caption: Option<String>,
    },
}

impl OutboundContent {
    pub fn text(text: impl Into<String>) -> Self {
        OutboundContent::Text(text.into())
    }
}

/// Acknowledgment returned by the transport for a delivered message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub message_id: String,
}

/// A known contact on the messaging channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub chat_key: ChatKey,
    pub name: String,
    pub profile_name: Option<String>,
    pub phone: Option<String>,
}

// =============================================================================
// Temporary artifacts
// =============================================================================

/// Downloaded voice audio staged in a temporary file.
///
/// The file is deleted when the clip is dropped, whatever the outcome of
/// transcription.
#[derive(Debug)]
pub struct AudioClip {
    file: tempfile::NamedTempFile,
    mime_type: String,
    len: usize,
}

impl AudioClip {
    /// Write the audio bytes to a fresh temporary file.
    pub fn stage(data: &[u8], mime_type: &str) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("paypilot-voice-")
            .suffix(&format!(".{}", audio_extension(mime_type)))
            .tempfile()?;
        file.write_all(data)?;
        file.flush()?;
        Ok(Self {
            file,
            mime_type: mime_type.to_string(),
            len: data.len(),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// File name to present to upstream APIs.
    pub fn file_name(&self) -> String {
        format!("voice.{}", audio_extension(&self.mime_type))
    }

    /// Read the staged bytes back.
    pub fn read(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.file.path())?)
    }
}

fn audio_extension(mime_type: &str) -> &'static str {
    let base = mime_type.split(';').next().unwrap_or("").trim();
    match base {
        "audio/ogg" | "audio/opus" => "ogg",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "m4a",
        "audio/webm" => "webm",
        _ => "bin",
    }
}

/// A rendered invoice document backed by a temporary file.
///
/// The file is removed when the document is dropped.
#[derive(Debug)]
pub struct RenderedDocument {
    path: tempfile::TempPath,
    file_name: String,
    mime_type: String,
}

impl RenderedDocument {
    pub fn new(path: tempfile::TempPath, file_name: String, mime_type: String) -> Self {
        Self {
            path,
            file_name,
            mime_type,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Outbound content referencing this document. The document must stay
    /// alive until the send completes.
    pub fn as_content(&self, caption: Option<String>) -> OutboundContent {
        OutboundContent::Document {
            path: self.path.to_path_buf(),
            file_name: self.file_name.clone(),
            mime_type: self.mime_type.clone(),
            caption,
        }
    }
}
