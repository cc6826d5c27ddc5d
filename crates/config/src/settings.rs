//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use talk_core::{CaptureOptions, TalkError};

/// Top-level talk-mode settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Voice mode toggles
    #[serde(default)]
    pub voice: VoiceSettings,

    /// Capture thresholds, passed through to the VAD backend
    #[serde(default)]
    pub capture: CaptureSettings,

    /// Speech-to-text backend
    #[serde(default)]
    pub stt: SttSettings,

    /// Text-to-speech backend
    #[serde(default)]
    pub tts: TtsSettings,

    /// Conversation relay (send + completion polling)
    #[serde(default)]
    pub relay: RelaySettings,

    /// UI surface behavior
    #[serde(default)]
    pub ui: UiSettings,
}

impl Settings {
    /// Load settings with layering: defaults → file (if present) →
    /// `TALK_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, TalkError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }

        let config = builder
            .add_source(Environment::with_prefix("TALK").separator("__"))
            .build()
            .map_err(|e| TalkError::Configuration(format!("failed to build config: {e}")))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| TalkError::Configuration(format!("invalid settings: {e}")))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check the prerequisites for starting a talk session.
    pub fn validate(&self) -> Result<(), TalkError> {
        if self.capture.min_speech_ms == 0 {
            return Err(TalkError::Configuration(
                "capture.min_speech_ms must be positive".into(),
            ));
        }
        if self.relay.poll_interval_ms == 0 {
            return Err(TalkError::Configuration(
                "relay.poll_interval_ms must be positive".into(),
            ));
        }
        if self.tts.sentences_per_chunk == 0 {
            return Err(TalkError::Configuration(
                "tts.sentences_per_chunk must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Check that voice mode and both speech capabilities are usable.
    /// Called by the session start operation; failure means the session
    /// never leaves Off.
    pub fn validate_for_start(&self) -> Result<(), TalkError> {
        self.validate()?;
        if !self.voice.enabled {
            return Err(TalkError::Configuration("voice mode is disabled".into()));
        }
        if self.stt.url.trim().is_empty() {
            return Err(TalkError::Configuration(
                "no transcription backend configured (stt.url)".into(),
            ));
        }
        if self.tts.backend == TtsBackendKind::Remote && self.tts.url.trim().is_empty() {
            return Err(TalkError::Configuration(
                "no synthesis backend configured (tts.url)".into(),
            ));
        }
        Ok(())
    }
}

/// Voice mode toggles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceSettings {
    /// Master switch for talk mode
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Barge-in: user speech while speaking cancels playback
    #[serde(default = "default_true")]
    pub auto_interrupt: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_interrupt: true,
        }
    }
}

/// Capture thresholds, forwarded verbatim to the VAD backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Silence duration that ends an utterance
    #[serde(default = "default_silence_threshold_ms")]
    pub silence_threshold_ms: u32,

    /// Minimum speech duration to count as an utterance
    #[serde(default = "default_min_speech_ms")]
    pub min_speech_ms: u32,
}

fn default_silence_threshold_ms() -> u32 {
    800
}

fn default_min_speech_ms() -> u32 {
    250
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            silence_threshold_ms: default_silence_threshold_ms(),
            min_speech_ms: default_min_speech_ms(),
        }
    }
}

impl CaptureSettings {
    pub fn as_options(&self) -> CaptureOptions {
        CaptureOptions {
            silence_threshold_ms: self.silence_threshold_ms,
            min_speech_ms: self.min_speech_ms,
        }
    }
}

/// Speech-to-text backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttSettings {
    /// Base URL of the transcription service
    #[serde(default = "default_stt_url")]
    pub url: String,

    /// Model hint forwarded to the backend
    #[serde(default)]
    pub model: Option<String>,

    /// Language hint forwarded to the backend
    #[serde(default)]
    pub language: Option<String>,

    /// Overall transcription timeout
    #[serde(default = "default_stt_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_stt_url() -> String {
    "http://127.0.0.1:5552".to_string()
}

fn default_stt_timeout_ms() -> u64 {
    15_000
}

impl Default for SttSettings {
    fn default() -> Self {
        Self {
            url: default_stt_url(),
            model: None,
            language: None,
            timeout_ms: default_stt_timeout_ms(),
        }
    }
}

/// Which synthesis backend drives playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TtsBackendKind {
    /// Network synthesizer, chunked with prefetch
    #[default]
    Remote,
    /// Local/offline synthesizer, speaks the whole text in one pass
    Local,
}

/// Text-to-speech backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsSettings {
    #[serde(default)]
    pub backend: TtsBackendKind,

    /// Base URL of the synthesis service (remote backend)
    #[serde(default = "default_tts_url")]
    pub url: String,

    /// Voice identifier forwarded to the backend
    #[serde(default)]
    pub voice: Option<String>,

    /// Speaking rate, 1.0 = normal
    #[serde(default = "default_rate")]
    pub rate: f32,

    /// Per-chunk synthesis timeout
    #[serde(default = "default_tts_timeout_ms")]
    pub timeout_ms: u64,

    /// Sentences grouped into one playback chunk
    #[serde(default = "default_sentences_per_chunk")]
    pub sentences_per_chunk: usize,
}

fn default_tts_url() -> String {
    "http://127.0.0.1:5553".to_string()
}

fn default_rate() -> f32 {
    1.0
}

fn default_tts_timeout_ms() -> u64 {
    20_000
}

fn default_sentences_per_chunk() -> usize {
    2
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            backend: TtsBackendKind::Remote,
            url: default_tts_url(),
            voice: None,
            rate: default_rate(),
            timeout_ms: default_tts_timeout_ms(),
            sentences_per_chunk: default_sentences_per_chunk(),
        }
    }
}

/// Conversation relay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    /// Completion poll cadence
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on waiting for a reply; expiry is a recoverable
    /// relay error
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_reply_timeout_ms() -> u64 {
    120_000
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            reply_timeout_ms: default_reply_timeout_ms(),
        }
    }
}

/// UI surface settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiSettings {
    /// How long a transient error stays in the snapshot before
    /// auto-clearing
    #[serde(default = "default_error_display_ms")]
    pub error_display_ms: u64,
}

fn default_error_display_ms() -> u64 {
    5_000
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            error_display_ms: default_error_display_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}
