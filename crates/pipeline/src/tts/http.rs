//! HTTP TTS backend
//!
//! Posts plain text and expects a binary audio payload. Non-2xx,
//! timeout, empty body, and non-audio content types are all
//! recoverable playback failures.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use talk_core::{AudioClip, Result, TalkError, TextToSpeech};

/// HTTP TTS backend configuration
#[derive(Debug, Clone)]
pub struct HttpTtsConfig {
    /// Base URL of the synthesis service
    pub url: String,
    /// Voice identifier forwarded to the backend
    pub voice: Option<String>,
    /// Speaking rate, 1.0 = normal
    pub rate: f32,
    /// Per-request timeout
    pub timeout_ms: u64,
}

impl Default for HttpTtsConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:5553".to_string(),
            voice: None,
            rate: 1.0,
            timeout_ms: 20_000,
        }
    }
}

#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<&'a str>,
    rate: f32,
}

/// TTS boundary over HTTP
pub struct HttpTts {
    config: HttpTtsConfig,
    client: reqwest::Client,
}

impl HttpTts {
    pub fn new(config: HttpTtsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| TalkError::Configuration(format!("failed to build TTS client: {e}")))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl TextToSpeech for HttpTts {
    async fn synthesize(&self, text: &str) -> Result<AudioClip> {
        let request = SynthesizeRequest {
            text,
            voice: self.config.voice.as_deref(),
            rate: self.config.rate,
        };

        let url = format!("{}/synthesize", self.config.url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| TalkError::Playback(format!("synthesis request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(TalkError::Playback(format!(
                "synthesis returned {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !content_type.starts_with("audio/") {
            return Err(TalkError::Playback(format!(
                "unexpected content type {content_type:?}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TalkError::Playback(format!("failed to read audio payload: {e}")))?;

        if bytes.is_empty() {
            return Err(TalkError::Playback("empty audio payload".into()));
        }

        tracing::debug!(bytes = bytes.len(), content_type = %content_type, "chunk synthesized");
        Ok(AudioClip::new(bytes.to_vec(), content_type))
    }
}
