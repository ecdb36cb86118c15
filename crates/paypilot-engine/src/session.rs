//! Per-chat conversation sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use paypilot_core::{ChatKey, DraftInvoice};
use tokio::sync::Mutex as AsyncMutex;

#[derive(Clone, Debug, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingConfirmation { draft: DraftInvoice },
}

#[derive(Clone, Debug)]
pub struct ConversationSession {
    pub state: SessionState,
    /// Unrecognized replies since the draft was proposed.
    pub reprompts: u32,
    pub updated_at: DateTime<Utc>,
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            reprompts: 0,
            updated_at: Utc::now(),
        }
    }
}

impl ConversationSession {
    pub fn is_awaiting_confirmation(&self) -> bool {
        matches!(self.state, SessionState::AwaitingConfirmation { .. })
    }

    pub fn await_confirmation(&mut self, draft: DraftInvoice) {
        self.state = SessionState::AwaitingConfirmation { draft };
        self.reprompts = 0;
        self.touch();
    }

    /// Move the pending draft out, leaving the session idle.
    pub fn take_draft(&mut self) -> Option<DraftInvoice> {
        let previous = std::mem::take(&mut self.state);
        self.reprompts = 0;
        self.touch();
        match previous {
            SessionState::AwaitingConfirmation { draft } => Some(draft),
            SessionState::Idle => None,
        }
    }

    pub fn clear(&mut self) {
        self.state = SessionState::Idle;
        self.reprompts = 0;
        self.touch();
    }

    pub fn record_reprompt(&mut self) -> u32 {
        self.reprompts += 1;
        self.touch();
        self.reprompts
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Sessions keyed by chat, created lazily.
///
/// The outer lock only guards the map; each session has its own async
/// mutex, held by the engine for the whole of one inbound event.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: Mutex<HashMap<ChatKey, Arc<AsyncMutex<ConversationSession>>>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self, chat: &ChatKey) -> Arc<AsyncMutex<ConversationSession>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(sessions.entry(chat.clone()).or_default())
    }

    /// Current state for `chat`, if a session exists.
    pub async fn state(&self, chat: &ChatKey) -> Option<SessionState> {
        let session = {
            let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
            sessions.get(chat).cloned()
        }?;
        let session = session.lock().await;
        Some(session.state.clone())
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
