//! Ordered provider chain with a deterministic fallback.

use async_trait::async_trait;
use chrono::Utc;
use paypilot_core::{Intent, IntentClassifier};
use tracing::{debug, warn};

use crate::patterns::PatternExtractor;
use crate::IntentProvider;

/// Tries each provider in order and falls back to the regex extractor.
///
/// A provider error moves on to the next provider. A provider answer of
/// `Unknown` is cross-checked against the extractor, which may still
/// recognize a terse command such as `paid 3f2a9c1b`.
pub struct ClassifierChain {
    providers: Vec<Box<dyn IntentProvider>>,
    fallback: PatternExtractor,
}

impl Default for ClassifierChain {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ClassifierChain {
    pub fn new(providers: Vec<Box<dyn IntentProvider>>) -> Self {
        Self {
            providers,
            fallback: PatternExtractor::new(),
        }
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }
}

#[async_trait]
impl IntentClassifier for ClassifierChain {
    async fn classify(&self, text: &str) -> Intent {
        for provider in &self.providers {
            match provider.classify(text).await {
                Ok(Intent::Unknown) => {
                    debug!(provider = provider.name(), "Provider returned unknown intent");
                    break;
                }
                Ok(intent) => {
                    debug!(provider = provider.name(), intent = intent.name(), "Intent classified");
                    return intent;
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "Intent provider failed, trying next");
                }
            }
        }

        let intent = self.fallback.extract(text, Utc::now());
        debug!(intent = intent.name(), "Intent classified by pattern extractor");
        intent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IntentError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedProvider {
        answer: Result<Intent, String>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl IntentProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn classify(&self, _text: &str) -> Result<Intent, IntentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone().map_err(IntentError::Http)
        }
    }

    fn provider(answer: Result<Intent, String>) -> (Box<dyn IntentProvider>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(FixedProvider {
                answer,
                calls: calls.clone(),
            }),
            calls,
        )
    }

    #[tokio::test]
    async fn test_first_successful_provider_wins() {
        let (first, first_calls) = provider(Ok(Intent::ListInvoices));
        let (second, second_calls) = provider(Ok(Intent::Unknown));
        let chain = ClassifierChain::new(vec![first, second]);

        assert_eq!(chain.classify("anything").await, Intent::ListInvoices);
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_provider_falls_through() {
        let (first, _) = provider(Err("connection refused".to_string()));
        let (second, second_calls) = provider(Ok(Intent::CheckStatus {
            invoice_id: Some("abc12345".to_string()),
        }));
        let chain = ClassifierChain::new(vec![first, second]);

        let intent = chain.classify("status abc12345").await;
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            intent,
            Intent::CheckStatus {
                invoice_id: Some("abc12345".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_all_providers_fail_uses_extractor() {
        let (first, _) = provider(Err("timeout".to_string()));
        let chain = ClassifierChain::new(vec![first]);
        assert_eq!(
            chain.classify("paid 3f2a9c1b").await,
            Intent::UpdatePayment {
                invoice_id: Some("3f2a9c1b".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_from_provider_checked_by_extractor() {
        let (first, _) = provider(Ok(Intent::Unknown));
        let chain = ClassifierChain::new(vec![first]);
        assert_eq!(chain.classify("list invoices").await, Intent::ListInvoices);
        assert_eq!(chain.classify("good morning").await, Intent::Unknown);
    }

    #[tokio::test]
    async fn test_empty_chain_is_extractor_only() {
        let chain = ClassifierChain::default();
        assert_eq!(chain.provider_count(), 0);
        assert_eq!(chain.classify("yes").await, Intent::Unknown);
    }
}
