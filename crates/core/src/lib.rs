//! Core traits and types for the talk-mode orchestrator
//!
//! This crate provides foundational types used across all other crates:
//! - Boundary traits for pluggable backends (capture, STT, TTS, conversation)
//! - Audio and utterance types
//! - Turn state machine states and legal transitions
//! - Agent message types
//! - Error taxonomy

pub mod audio;
pub mod error;
pub mod message;
pub mod state;
pub mod traits;

pub use audio::{AudioClip, Utterance};
pub use error::{Result, TalkError};
pub use message::{AgentMessage, MessagePart, MessageRole, SessionBinding};
pub use state::{PendingReply, SessionSnapshot, TurnState};
pub use traits::{
    AudioSink, CaptureEvent, CaptureOptions, ConversationClient, LocalSpeech, SpeechToText,
    TextToSpeech, Transcript, VoiceCapture,
};
