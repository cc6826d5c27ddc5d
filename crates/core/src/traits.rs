//! Boundary traits for pluggable backends
//!
//! VAD inference, STT/TTS model internals, and the agent's execution
//! engine all live behind these traits. Production implementations are
//! HTTP adapters in `talk-pipeline`; tests use in-memory mocks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::audio::AudioClip;
use crate::error::Result;
use crate::message::{AgentMessage, SessionBinding};

/// VAD primitive emitted by the capture backend.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// User started speaking
    SpeechStart,
    /// A speech segment ended; raw samples for the whole segment
    SpeechEnd { samples: Vec<f32>, sample_rate: u32 },
    /// Speech detected but too short to be real
    Misfire,
}

/// Thresholds passed through to the capture backend, not interpreted
/// by the orchestrator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CaptureOptions {
    /// Silence duration that ends an utterance
    pub silence_threshold_ms: u32,
    /// Minimum speech duration to count as an utterance
    pub min_speech_ms: u32,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            silence_threshold_ms: 800,
            min_speech_ms: 250,
        }
    }
}

/// Continuous microphone capture with voice-activity segmentation.
///
/// `start` must not return until capture is actually live (or has
/// failed); the orchestrator's Initializing state hangs on that.
#[async_trait]
pub trait VoiceCapture: Send + Sync {
    async fn start(
        &self,
        options: CaptureOptions,
        events: mpsc::Sender<CaptureEvent>,
    ) -> Result<()>;

    /// Release the microphone stream. Idempotent.
    async fn stop(&self);
}

/// Recognized text plus backend-reported metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub language: Option<String>,
    pub language_confidence: Option<f32>,
    pub duration_secs: Option<f32>,
}

/// Speech-to-text boundary. Input is an encoded WAV container
/// (mono, 16-bit PCM).
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<Transcript>;
}

/// Network text-to-speech boundary: plain text in, audio payload out.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<AudioClip>;
}

/// Local/offline synthesis: the backend speaks the whole text itself,
/// so no chunking or sink is involved. `speak` resolves when speech
/// finishes or is stopped.
#[async_trait]
pub trait LocalSpeech: Send + Sync {
    async fn speak(&self, text: &str, voice: Option<&str>, rate: f32) -> Result<()>;

    /// Halt in-progress speech. Idempotent.
    async fn stop(&self);
}

/// Audio output handle for synthesized clips.
///
/// `play` resolves when the clip has finished; cancelling it (dropping
/// the future, or a concurrent `stop`) must halt output promptly.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, clip: AudioClip) -> Result<()>;

    /// Halt any in-progress playback and release the output handle.
    /// Idempotent.
    async fn stop(&self);
}

/// The agent session's message API.
#[async_trait]
pub trait ConversationClient: Send + Sync {
    /// Post the user's text as a new message on the bound session.
    async fn send_message(&self, binding: &SessionBinding, text: &str) -> Result<()>;

    /// Fetch the ordered message list for completion polling.
    async fn list_messages(&self, binding: &SessionBinding) -> Result<Vec<AgentMessage>>;
}
