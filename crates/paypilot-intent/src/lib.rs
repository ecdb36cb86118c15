//! Intent classification for operator messages.
//!
//! A [`ClassifierChain`] consults hosted language-model providers first and
//! falls back to the deterministic [`PatternExtractor`].

pub mod chain;
pub mod due_date;
pub mod error;
pub mod llm;
pub mod patterns;

use async_trait::async_trait;
use paypilot_core::Intent;

pub use chain::ClassifierChain;
pub use error::IntentError;
pub use llm::LlmIntentProvider;
pub use patterns::PatternExtractor;

/// A single classification strategy inside a [`ClassifierChain`].
#[async_trait]
pub trait IntentProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn classify(&self, text: &str) -> Result<Intent, IntentError>;
}
