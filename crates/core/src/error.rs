//! Error taxonomy for the talk-mode orchestrator
//!
//! Errors are cloneable (string payloads) so they can ride broadcast
//! channels and be recorded in session snapshots.

use thiserror::Error;

/// Talk-mode errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TalkError {
    /// Audio capture failed (device missing, permission denied).
    /// Fatal to the session.
    #[error("capture error: {0}")]
    Capture(String),

    /// Transcription backend failed or timed out. Recoverable: the
    /// session returns to listening.
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Sending to or polling the agent session failed. Recoverable.
    #[error("relay error: {0}")]
    Relay(String),

    /// Synthesis or audio playback failed. Recoverable.
    #[error("playback error: {0}")]
    Playback(String),

    /// Voice mode or a prerequisite capability is not configured.
    /// The session never starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An internal channel closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// An operation exceeded its deadline.
    #[error("timed out after {0}ms")]
    Timeout(u64),
}

impl TalkError {
    /// Whether this error tears the session down.
    ///
    /// Only capture and configuration failures are fatal; everything
    /// else is absorbed and the session returns to listening.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TalkError::Capture(_) | TalkError::Configuration(_))
    }
}

/// Result alias used across the workspace
pub type Result<T> = std::result::Result<T, TalkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality() {
        assert!(TalkError::Capture("no device".into()).is_fatal());
        assert!(TalkError::Configuration("stt disabled".into()).is_fatal());
        assert!(!TalkError::Transcription("timeout".into()).is_fatal());
        assert!(!TalkError::Relay("send failed".into()).is_fatal());
        assert!(!TalkError::Playback("bad content type".into()).is_fatal());
        assert!(!TalkError::Timeout(500).is_fatal());
    }
}
