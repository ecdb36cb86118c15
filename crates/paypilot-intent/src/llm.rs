//! OpenAI-compatible chat-completions intent provider.
//!
//! Works against any endpoint speaking the `/chat/completions` protocol
//! (Groq by default). The model is asked for a single JSON object which is
//! mapped onto [`Intent`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paypilot_core::config::ClassifierConfig;
use paypilot_core::{Intent, InvoiceRequest};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::due_date::parse_date_value;
use crate::error::IntentError;
use crate::IntentProvider;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<Message>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Shape of the JSON object the model is asked to produce. Both snake_case
/// and camelCase keys are accepted.
#[derive(Debug, Default, Deserialize)]
struct ExtractedIntent {
    #[serde(default)]
    intent: String,
    #[serde(default, alias = "customerName")]
    customer_name: Option<String>,
    #[serde(default, alias = "customerPhone")]
    customer_phone: Option<String>,
    #[serde(default)]
    amount: Option<serde_json::Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "dueDate")]
    due_date: Option<String>,
    #[serde(default, alias = "invoiceId")]
    invoice_id: Option<serde_json::Value>,
}

/// Intent provider backed by a hosted chat model.
pub struct LlmIntentProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl LlmIntentProvider {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, IntentError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    /// Build from configuration. Returns `Ok(None)` when no API key is set.
    pub fn from_config(config: &ClassifierConfig) -> Result<Option<Self>, IntentError> {
        match config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            Some(key) => Self::new(
                key,
                config.base_url.clone(),
                config.model.clone(),
                Duration::from_secs(config.timeout_secs),
            )
            .map(Some),
            None => Ok(None),
        }
    }

    async fn complete(&self, text: &str, now: DateTime<Utc>) -> Result<String, IntentError> {
        let request = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            messages: vec![
                Message {
                    role: "system",
                    content: system_prompt(now),
                },
                Message {
                    role: "user",
                    content: text.to_string(),
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(IntentError::Provider { status, body });
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| IntentError::InvalidResponse("empty completion".to_string()))
    }
}

#[async_trait]
impl IntentProvider for LlmIntentProvider {
    fn name(&self) -> &str {
        "llm"
    }

    async fn classify(&self, text: &str) -> Result<Intent, IntentError> {
        let raw = self.complete(text, Utc::now()).await?;
        debug!(model = %self.model, response = %raw, "Intent completion received");
        parse_completion(&raw)
    }
}

fn system_prompt(now: DateTime<Utc>) -> String {
    format!(
        "You are an invoice assistant. Today is {today}. Extract structured data from the \
         user's request. Output ONLY one valid JSON object.\n\
         To create an invoice return: {{\"intent\": \"create_invoice\", \"customer_name\": \"...\", \
         \"customer_phone\": null, \"amount\": 0, \"description\": \"...\", \"due_date\": \"YYYY-MM-DD\"}}. \
         Use null for anything not mentioned.\n\
         To mark an invoice paid (e.g. 'paid 3f2a9c1b') return: {{\"intent\": \"update_payment\", \"invoice_id\": \"...\"}}.\n\
         To check an invoice status return: {{\"intent\": \"check_status\", \"invoice_id\": \"...\"}}.\n\
         To list invoices return: {{\"intent\": \"list_invoices\"}}.\n\
         If you cannot understand, return: {{\"intent\": \"unknown\"}}.",
        today = now.format("%Y-%m-%d")
    )
}

/// Map the model's JSON answer onto an [`Intent`].
///
/// Unrecognized intent names map to [`Intent::Unknown`]; malformed JSON is
/// an error so the chain can fall through.
pub(crate) fn parse_completion(raw: &str) -> Result<Intent, IntentError> {
    let json = strip_code_fence(raw);
    let extracted: ExtractedIntent = serde_json::from_str(json)?;

    let intent = match extracted.intent.trim().to_ascii_lowercase().as_str() {
        "create_invoice" => Intent::CreateInvoice(InvoiceRequest {
            customer_name: non_empty(extracted.customer_name),
            customer_phone: non_empty(extracted.customer_phone),
            amount: extracted.amount.as_ref().and_then(number_value),
            description: non_empty(extracted.description),
            due_date: extracted.due_date.as_deref().and_then(parse_date_value),
        }),
        "update_payment" => Intent::UpdatePayment {
            invoice_id: extracted.invoice_id.as_ref().and_then(id_value),
        },
        "check_status" => Intent::CheckStatus {
            invoice_id: extracted.invoice_id.as_ref().and_then(id_value),
        },
        "list_invoices" => Intent::ListInvoices,
        _ => Intent::Unknown,
    };
    Ok(intent)
}

/// Models occasionally wrap JSON in a markdown fence.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
}

fn number_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s
            .trim()
            .trim_start_matches(['₹', '$', '€'])
            .replace(',', "")
            .trim()
            .parse()
            .ok(),
        _ => None,
    }
}

fn id_value(value: &serde_json::Value) -> Option<String> {
    let id = match value {
        serde_json::Value::String(s) => s.trim().trim_start_matches('#').to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if id.is_empty() {
        None
    } else {
        Some(id.to_ascii_lowercase())
    }
}
