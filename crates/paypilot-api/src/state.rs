//! Application state shared across route handlers.

use std::sync::Arc;
use std::time::Instant;

use paypilot_core::PayPilotConfig;
use paypilot_engine::{ConversationEngine, ReminderScheduler};
use paypilot_storage::ContactDirectory;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PayPilotConfig>,
    pub engine: Arc<ConversationEngine>,
    /// `None` when the scheduler is disabled in config.
    pub scheduler: Option<Arc<ReminderScheduler>>,
    pub contacts: ContactDirectory,
    /// Bearer token required on every route except `/health`.
    pub api_token: String,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: PayPilotConfig,
        engine: Arc<ConversationEngine>,
        scheduler: Option<Arc<ReminderScheduler>>,
        contacts: ContactDirectory,
        api_token: String,
    ) -> Self {
        Self {
            config: Arc::new(config),
            engine,
            scheduler,
            contacts,
            api_token,
            start_time: Instant::now(),
        }
    }
}
