//! HTTP STT backend
//!
//! Speaks the Whisper sidecar protocol: base64 WAV posted to
//! `/transcribe-base64`, JSON response with recognized text, detected
//! language, a confidence score, and utterance duration. Non-2xx and
//! timeouts both surface as recoverable transcription failures.

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use talk_core::{Result, SpeechToText, TalkError, Transcript};

/// HTTP STT backend configuration
#[derive(Debug, Clone)]
pub struct HttpSttConfig {
    /// Base URL of the transcription service
    pub url: String,
    /// Model hint forwarded to the backend
    pub model: Option<String>,
    /// Language hint forwarded to the backend
    pub language: Option<String>,
    /// Request timeout
    pub timeout_ms: u64,
}

impl Default for HttpSttConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:5552".to_string(),
            model: None,
            language: None,
            timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Serialize)]
struct TranscribeRequest<'a> {
    audio: String,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    language_probability: Option<f32>,
    #[serde(default)]
    duration: Option<f32>,
}

/// STT boundary over HTTP
pub struct HttpStt {
    config: HttpSttConfig,
    client: reqwest::Client,
}

impl HttpStt {
    pub fn new(config: HttpSttConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| TalkError::Configuration(format!("failed to build STT client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Construct and probe the service's health endpoint. The probe is
    /// informational only; an unreachable service is reported on the
    /// first real request.
    pub async fn connect(config: HttpSttConfig) -> Result<Self> {
        let stt = Self::new(config)?;
        let health_url = format!("{}/health", stt.config.url);
        match stt.client.get(&health_url).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(url = %stt.config.url, "STT backend reachable");
            },
            Ok(resp) => {
                tracing::warn!(
                    url = %stt.config.url,
                    status = %resp.status(),
                    "STT health probe returned non-success"
                );
            },
            Err(e) => {
                tracing::warn!(url = %stt.config.url, error = %e, "STT backend not reachable yet");
            },
        }
        Ok(stt)
    }
}

#[async_trait]
impl SpeechToText for HttpStt {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<Transcript> {
        let request = TranscribeRequest {
            audio: base64::engine::general_purpose::STANDARD.encode(&wav),
            format: "wav",
            model: self.config.model.as_deref(),
            language: self.config.language.as_deref(),
        };

        let url = format!("{}/transcribe-base64", self.config.url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| TalkError::Transcription(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(TalkError::Transcription(format!(
                "backend returned {}",
                response.status()
            )));
        }

        let body: TranscribeResponse = response
            .json()
            .await
            .map_err(|e| TalkError::Transcription(format!("invalid response: {e}")))?;

        Ok(Transcript {
            text: body.text,
            language: body.language,
            language_confidence: body.language_probability,
            duration_secs: body.duration,
        })
    }
}
