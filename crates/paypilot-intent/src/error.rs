//! Error types for intent classification.

use paypilot_core::PayPilotError;

/// Errors from an intent provider call.
#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    #[error("Provider request failed: {0}")]
    Http(String),
    #[error("Provider returned {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("Provider returned an unusable response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for IntentError {
    fn from(err: reqwest::Error) -> Self {
        IntentError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for IntentError {
    fn from(err: serde_json::Error) -> Self {
        IntentError::InvalidResponse(err.to_string())
    }
}

impl From<IntentError> for PayPilotError {
    fn from(err: IntentError) -> Self {
        PayPilotError::Classifier(err.to_string())
    }
}
