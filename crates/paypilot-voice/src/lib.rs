//! PayPilot voice crate - speech-to-text for operator voice notes.
//!
//! Hosted providers sit behind the [`SpeechToText`] trait and are combined
//! into a [`TranscriberChain`], which implements the engine-facing
//! [`paypilot_core::Transcriber`].

pub mod chain;
pub mod error;
pub mod sarvam;
pub mod whisper;

use std::time::Duration;

use async_trait::async_trait;
use paypilot_core::config::TranscriptionConfig;
use paypilot_core::AudioClip;
use tracing::warn;

pub use chain::TranscriberChain;
pub use error::VoiceError;
pub use sarvam::SarvamProvider;
pub use whisper::WhisperProvider;

/// One hosted transcription backend.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn transcribe(&self, clip: &AudioClip) -> Result<String, VoiceError>;
}

/// Build the provider chain from configuration: Sarvam first, then Whisper.
/// Providers without an API key are left out.
pub fn chain_from_config(config: &TranscriptionConfig) -> TranscriberChain {
    let timeout = Duration::from_secs(config.timeout_secs);
    let mut providers: Vec<Box<dyn SpeechToText>> = Vec::new();

    if let Some(key) = config.sarvam_api_key.as_deref().filter(|k| !k.is_empty()) {
        match SarvamProvider::new(key, timeout) {
            Ok(provider) => providers.push(Box::new(provider)),
            Err(e) => warn!(error = %e, "Failed to build Sarvam provider"),
        }
    }
    if let Some(key) = config.openai_api_key.as_deref().filter(|k| !k.is_empty()) {
        match WhisperProvider::new(key, config.model.clone(), timeout) {
            Ok(provider) => providers.push(Box::new(provider)),
            Err(e) => warn!(error = %e, "Failed to build Whisper provider"),
        }
    }

    TranscriberChain::new(providers)
}

/// Multipart file part carrying the staged audio.
pub(crate) fn audio_part(clip: &AudioClip) -> Result<reqwest::multipart::Part, VoiceError> {
    let bytes = clip.read()?;
    let part = reqwest::multipart::Part::bytes(bytes)
        .file_name(clip.file_name())
        .mime_str(base_mime(clip.mime_type()))?;
    Ok(part)
}

fn base_mime(mime_type: &str) -> &str {
    mime_type.split(';').next().unwrap_or(mime_type).trim()
}
