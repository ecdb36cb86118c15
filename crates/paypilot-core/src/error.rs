use thiserror::Error;

use crate::types::InvoiceStatus;

/// Top-level error type for PayPilot.
///
/// Collaborator implementations (store, renderer, transport, providers)
/// report failures through this type. Subsystem crates define their own
/// error enums and convert into `PayPilotError` so that `?` works across
/// crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PayPilotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: InvoiceStatus,
        to: InvoiceStatus,
    },

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for PayPilotError {
    fn from(err: toml::de::Error) -> Self {
        PayPilotError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for PayPilotError {
    fn from(err: toml::ser::Error) -> Self {
        PayPilotError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for PayPilotError {
    fn from(err: serde_json::Error) -> Self {
        PayPilotError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for PayPilot operations.
pub type Result<T> = std::result::Result<T, PayPilotError>;
