//! Error types for speech-to-text providers.

use paypilot_core::PayPilotError;

#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("Transcription request failed: {0}")]
    Http(String),
    #[error("Transcription provider returned {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("Transcription provider returned no text")]
    EmptyTranscript,
    #[error("Audio read failed: {0}")]
    Audio(String),
}

impl From<reqwest::Error> for VoiceError {
    fn from(err: reqwest::Error) -> Self {
        VoiceError::Http(err.to_string())
    }
}

impl From<PayPilotError> for VoiceError {
    fn from(err: PayPilotError) -> Self {
        VoiceError::Audio(err.to_string())
    }
}

impl From<VoiceError> for PayPilotError {
    fn from(err: VoiceError) -> Self {
        PayPilotError::Transcription(err.to_string())
    }
}
