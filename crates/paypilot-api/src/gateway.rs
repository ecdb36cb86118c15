//! HTTP gateway transport.
//!
//! Outbound messages are POSTed as JSON to `{base_url}/messages` on the
//! messaging gateway; documents travel inline as base64. Customer chats are
//! resolved through the local contact directory.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use paypilot_core::config::GatewayConfig;
use paypilot_core::{ChatKey, DeliveryReceipt, OutboundContent, PayPilotError, Transport};
use paypilot_storage::ContactDirectory;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Gateway returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to read document: {0}")]
    Document(#[from] std::io::Error),
}

impl From<GatewayError> for PayPilotError {
    fn from(err: GatewayError) -> Self {
        PayPilotError::Transport(err.to_string())
    }
}

/// Wire format of an outbound message.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Text {
        to: String,
        text: String,
    },
    Document {
        to: String,
        file_name: String,
        mime_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
        data_base64: String,
    },
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: String,
}

#[derive(Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    contacts: ContactDirectory,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig, contacts: ContactDirectory) -> Result<Self, PayPilotError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(GatewayError::from)?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            contacts,
        })
    }

    async fn encode(to: &ChatKey, content: OutboundContent) -> Result<OutboundMessage, GatewayError> {
        let to = to.as_str().to_string();
        Ok(match content {
            OutboundContent::Text(text) => OutboundMessage::Text { to, text },
            OutboundContent::Document {
                path,
                file_name,
                mime_type,
                caption,
            } => {
                let data = tokio::fs::read(&path).await?;
                OutboundMessage::Document {
                    to,
                    file_name,
                    mime_type,
                    caption,
                    data_base64: general_purpose::STANDARD.encode(data),
                }
            }
        })
    }

    async fn post(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, GatewayError> {
        let mut request = self
            .client
            .post(format!("{}/messages", self.base_url))
            .json(message);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status { status, body });
        }
        let body: SendResponse = response.json().await?;
        Ok(DeliveryReceipt {
            message_id: body.id,
        })
    }
}

#[async_trait]
impl Transport for HttpGateway {
    async fn send(
        &self,
        to: &ChatKey,
        content: OutboundContent,
    ) -> Result<DeliveryReceipt, PayPilotError> {
        let message = Self::encode(to, content).await?;
        let receipt = self.post(&message).await?;
        debug!(to = %to, id = %receipt.message_id, "Gateway accepted message");
        Ok(receipt)
    }

    async fn resolve_contact(
        &self,
        name: &str,
        phone: Option<&str>,
    ) -> Result<Option<ChatKey>, PayPilotError> {
        self.contacts.resolve(name, phone).await
    }
}
