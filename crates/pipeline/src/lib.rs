//! Talk-mode pipeline components
//!
//! This crate provides the four data-plane components of the voice
//! turn-taking orchestrator:
//! - Capture bridge: VAD events → discrete utterances + barge-in signals
//! - Transcription dispatcher: utterance → recognized text
//! - Conversation relay: message send + reply completion polling
//! - Speech playback: sanitize, chunk, prefetch, synthesize, play, stop

pub mod capture;
pub mod relay;
pub mod stt;
pub mod tts;

pub use capture::{BridgeSignal, CaptureBridge};
pub use relay::{ConversationRelay, HttpConversation, HttpConversationConfig};
pub use stt::{HttpStt, HttpSttConfig, Transcriber};
pub use tts::{
    ChannelSink, ChunkState, HttpTts, HttpTtsConfig, PlaybackHandle, PlaybackOutcome,
    PlaybackQueue, SentenceChunker, SinkRequest, SpeakerBackend, SpeechPlayback,
};
pub use tts::sanitize::sanitize_for_speech;
