//! OpenAI Whisper transcription provider.

use std::time::Duration;

use async_trait::async_trait;
use paypilot_core::AudioClip;
use serde::Deserialize;

use crate::error::VoiceError;
use crate::{audio_part, SpeechToText};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

pub struct WhisperProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl WhisperProvider {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, VoiceError> {
        Self::with_base_url(api_key, OPENAI_BASE_URL, model, timeout)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, VoiceError> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl SpeechToText for WhisperProvider {
    fn name(&self) -> &str {
        "whisper"
    }

    async fn transcribe(&self, clip: &AudioClip) -> Result<String, VoiceError> {
        let form = reqwest::multipart::Form::new()
            .part("file", audio_part(clip)?)
            .text("model", self.model.clone());

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Provider { status, body });
        }

        let body: TranscriptionResponse = response.json().await?;
        let text = body.text.trim();
        if text.is_empty() {
            return Err(VoiceError::EmptyTranscript);
        }
        Ok(text.to_string())
    }
}
