//! Error types for the conversation engine and reminder scheduler.

use paypilot_core::PayPilotError;

use crate::reminders::JobKind;

/// Outcome of an engine action that did not go to plan.
///
/// The display text is addressed to the operator and is sent back as the
/// reply; collaborator error details are logged, never echoed.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),
    #[error("Invoice {0} not found.")]
    NotFound(String),
    #[error("{0}")]
    Provider(String),
    #[error("{0}")]
    PartialDelivery(String),
}

impl EngineError {
    /// Reply text for the operator.
    pub fn user_message(&self) -> String {
        match self {
            EngineError::Validation(msg) => format!("⚠️ {}", msg),
            EngineError::NotFound(_) => format!("❓ {}", self),
            EngineError::Provider(msg) => format!("❌ {}", msg),
            EngineError::PartialDelivery(msg) => format!("ℹ️ {}", msg),
        }
    }
}

/// Errors from the reminder scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Invalid cron expression for {job} job: {reason}")]
    InvalidCron { job: JobKind, reason: String },
    #[error("The {0} job is already running")]
    AlreadyRunning(JobKind),
    #[error("Unknown reminder job: {0}")]
    UnknownJob(String),
    #[error("Store error: {0}")]
    Store(#[from] PayPilotError),
}
