use async_trait::async_trait;
use paypilot_core::{AudioClip, Transcriber};
use tracing::{debug, info, warn};

use crate::SpeechToText;

/// Tries each provider in order; the first non-empty transcript wins.
///
/// When every provider fails, or none is configured, the result is empty
/// text and the caller tells the operator the voice note was not understood.
#[derive(Default)]
pub struct TranscriberChain {
    providers: Vec<Box<dyn SpeechToText>>,
}

impl TranscriberChain {
    pub fn new(providers: Vec<Box<dyn SpeechToText>>) -> Self {
        Self { providers }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl Transcriber for TranscriberChain {
    async fn transcribe(&self, clip: &AudioClip) -> String {
        if self.providers.is_empty() {
            warn!("No transcription provider configured");
            return String::new();
        }

        for provider in &self.providers {
            match provider.transcribe(clip).await {
                Ok(text) => {
                    info!(
                        provider = provider.name(),
                        bytes = clip.len(),
                        chars = text.len(),
                        "Voice note transcribed"
                    );
                    return text;
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "Transcription failed, trying next");
                }
            }
        }

        debug!("All transcription providers failed");
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VoiceError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Scripted {
        answer: Option<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SpeechToText for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn transcribe(&self, _clip: &AudioClip) -> Result<String, VoiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
                .map(str::to_string)
                .ok_or_else(|| VoiceError::Http("unreachable".to_string()))
        }
    }

    fn scripted(answer: Option<&'static str>) -> (Box<dyn SpeechToText>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(Scripted {
                answer,
                calls: calls.clone(),
            }),
            calls,
        )
    }

    fn clip() -> AudioClip {
        AudioClip::stage(b"audio", "audio/ogg").unwrap()
    }

    #[tokio::test]
    async fn test_falls_back_to_second_provider() {
        let (first, first_calls) = scripted(None);
        let (second, second_calls) = scripted(Some("invoice ABC 15000"));
        let chain = TranscriberChain::new(vec![first, second]);

        assert_eq!(chain.transcribe(&clip()).await, "invoice ABC 15000");
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let (first, _) = scripted(Some("paid 102"));
        let (second, second_calls) = scripted(Some("never"));
        let chain = TranscriberChain::new(vec![first, second]);

        assert_eq!(chain.transcribe(&clip()).await, "paid 102");
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_fail_yields_empty() {
        let (first, _) = scripted(None);
        let (second, _) = scripted(None);
        let chain = TranscriberChain::new(vec![first, second]);

        assert_eq!(chain.transcribe(&clip()).await, "");
    }

    #[tokio::test]
    async fn test_no_providers_yields_empty() {
        let chain = TranscriberChain::default();
        assert!(chain.is_empty());
        assert_eq!(chain.transcribe(&clip()).await, "");
    }
}
