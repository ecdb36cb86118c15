//! Route handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use base64::{engine::general_purpose, Engine as _};
use paypilot_core::{ChatKey, Contact, InboundEvent, Invoice, InvoiceFilter, InvoiceStatus, Media};
use paypilot_engine::{EventOutcome, JobKind, JobReport};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request and response types
// =============================================================================

/// Inbound message as delivered by the messaging gateway.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct InboundPayload {
    pub chat_key: String,
    #[serde(default)]
    pub body: String,
    pub voice_base64: Option<String>,
    pub mime_type: Option<String>,
    /// Set for attachments other than voice notes.
    #[serde(default)]
    pub has_media: bool,
    pub profile_name: Option<String>,
}

impl InboundPayload {
    pub fn into_event(self) -> Result<InboundEvent, ApiError> {
        let chat_key = self.chat_key.trim();
        if chat_key.is_empty() {
            return Err(ApiError::BadRequest("chat_key is required".to_string()));
        }

        let media = match self.voice_base64 {
            Some(encoded) => {
                let data = general_purpose::STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| ApiError::BadRequest(format!("Invalid voice_base64: {}", e)))?;
                Some(Media::Voice {
                    data,
                    mime_type: self.mime_type.unwrap_or_else(|| "audio/ogg".to_string()),
                })
            }
            None if self.has_media => Some(Media::Other {
                mime_type: self
                    .mime_type
                    .unwrap_or_else(|| "application/octet-stream".to_string()),
            }),
            None => None,
        };

        Ok(InboundEvent {
            chat_key: ChatKey::new(chat_key),
            body: self.body,
            media,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct InvoiceParams {
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvoiceListResponse {
    pub invoices: Vec<Invoice>,
    pub total: usize,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ContactPayload {
    pub chat_key: String,
    pub name: String,
    pub profile_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobRunResponse {
    pub job: JobKind,
    pub report: JobReport,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub scheduler_enabled: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        scheduler_enabled: state.scheduler.is_some(),
    })
}

/// POST /inbound - run one message through the conversation engine.
pub async fn inbound(
    State(state): State<AppState>,
    Json(payload): Json<InboundPayload>,
) -> Result<Json<EventOutcome>, ApiError> {
    let profile_name = payload.profile_name.clone();
    let event = payload.into_event()?;

    if let Some(profile) = profile_name.as_deref() {
        if let Err(e) = state.contacts.remember_profile(&event.chat_key, profile).await {
            warn!(chat = %event.chat_key, error = %e, "Failed to record profile name");
        }
    }

    Ok(Json(state.engine.handle_event(event).await))
}

/// GET /invoices?status= - the operator's invoices, newest first.
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(params): Query<InvoiceParams>,
) -> Result<Json<InvoiceListResponse>, ApiError> {
    let status = params
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<InvoiceStatus>())
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let filter = InvoiceFilter {
        status,
        owner: Some(state.engine.settings().operator.clone()),
        ..Default::default()
    };
    let invoices = state.engine.store().list(&filter).await?;
    Ok(Json(InvoiceListResponse {
        total: invoices.len(),
        invoices,
    }))
}

/// PUT /contacts - add or update a customer contact.
pub async fn upsert_contact(
    State(state): State<AppState>,
    Json(payload): Json<ContactPayload>,
) -> Result<Json<Contact>, ApiError> {
    let chat_key = payload.chat_key.trim();
    let name = payload.name.trim();
    if chat_key.is_empty() || name.is_empty() {
        return Err(ApiError::BadRequest(
            "chat_key and name are required".to_string(),
        ));
    }

    let contact = Contact {
        chat_key: ChatKey::new(chat_key),
        name: name.to_string(),
        profile_name: payload.profile_name,
        phone: payload.phone,
    };
    state.contacts.upsert(&contact).await?;
    info!(chat = %contact.chat_key, name = %contact.name, "Contact upserted");
    Ok(Json(contact))
}

/// POST /reminders/{job}/run - run a reminder job now.
pub async fn run_reminder(
    State(state): State<AppState>,
    Path(job): Path<String>,
) -> Result<Json<JobRunResponse>, ApiError> {
    let kind: JobKind = job.parse()?;
    let scheduler = state
        .scheduler
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("Reminder scheduler is disabled".to_string()))?;

    let report = scheduler.trigger(kind).await?;
    Ok(Json(JobRunResponse { job: kind, report }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_text_event() {
        let event = InboundPayload {
            chat_key: " op@c.us ".to_string(),
            body: "list invoices".to_string(),
            ..Default::default()
        }
        .into_event()
        .unwrap();
        assert_eq!(event, InboundEvent::text("op@c.us", "list invoices"));
    }

    #[test]
    fn test_payload_voice_event() {
        let event = InboundPayload {
            chat_key: "op".to_string(),
            voice_base64: Some(general_purpose::STANDARD.encode(b"OggS")),
            mime_type: Some("audio/ogg; codecs=opus".to_string()),
            ..Default::default()
        }
        .into_event()
        .unwrap();
        assert!(event.is_voice());
        assert!(matches!(event.media, Some(Media::Voice { ref data, .. }) if data == b"OggS"));
    }

    #[test]
    fn test_payload_other_media() {
        let event = InboundPayload {
            chat_key: "op".to_string(),
            has_media: true,
            mime_type: Some("image/png".to_string()),
            ..Default::default()
        }
        .into_event()
        .unwrap();
        assert!(event.has_non_voice_media());
    }

    #[test]
    fn test_payload_rejects_bad_input() {
        assert!(InboundPayload::default().into_event().is_err());
        let bad = InboundPayload {
            chat_key: "op".to_string(),
            voice_base64: Some("@@not base64@@".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad.into_event(), Err(ApiError::BadRequest(_))));
    }
}
