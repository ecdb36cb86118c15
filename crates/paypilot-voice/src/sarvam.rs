//! Sarvam speech-to-text-translate provider.
//!
//! Transcribes Indic-language voice notes and translates them to English in
//! one call, which suits operators dictating in Hindi or Hinglish.

use std::time::Duration;

use async_trait::async_trait;
use paypilot_core::AudioClip;
use serde::Deserialize;

use crate::error::VoiceError;
use crate::{audio_part, SpeechToText};

pub const SARVAM_BASE_URL: &str = "https://api.sarvam.ai";
const SARVAM_MODEL: &str = "saaras:v1";

#[derive(Deserialize)]
struct SarvamResponse {
    #[serde(default)]
    transcript: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

pub struct SarvamProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SarvamProvider {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, VoiceError> {
        Self::with_base_url(api_key, SARVAM_BASE_URL, timeout)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, VoiceError> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SpeechToText for SarvamProvider {
    fn name(&self) -> &str {
        "sarvam"
    }

    async fn transcribe(&self, clip: &AudioClip) -> Result<String, VoiceError> {
        let form = reqwest::multipart::Form::new()
            .part("file", audio_part(clip)?)
            .text("model", SARVAM_MODEL);

        let response = self
            .client
            .post(format!("{}/speech-to-text-translate", self.base_url))
            .header("api-subscription-key", &self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Provider { status, body });
        }

        let body: SarvamResponse = response.json().await?;
        body.transcript
            .or(body.text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(VoiceError::EmptyTranscript)
    }
}
