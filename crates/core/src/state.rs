//! Turn state machine states and legal transitions

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Where the conversation is. Single source of truth, arbitrated by the
/// session's owner task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TurnState {
    /// No session active
    #[default]
    Off,
    /// Start requested, waiting for capture to come up
    Initializing,
    /// Capture live, waiting for a user utterance
    Listening,
    /// Utterance dispatched, awaiting transcription or the agent's reply
    Thinking,
    /// Speaking the agent's reply
    Speaking,
    /// Unrecoverable failure; inert until explicit stop/restart
    Error,
}

impl TurnState {
    /// Whether `self -> to` is a legal edge.
    ///
    /// Explicit stop is always legal (any state to Off). Error is
    /// reachable from every live state and recoverable only via Off.
    pub fn can_transition(self, to: TurnState) -> bool {
        use TurnState::*;
        match (self, to) {
            (_, Off) => true,
            (Off, Initializing) => true,
            (Initializing, Listening) => true,
            (Listening, Thinking) => true,
            (Thinking, Listening) => true,
            (Thinking, Speaking) => true,
            (Listening, Speaking) => true,
            (Speaking, Listening) => true,
            (Initializing | Listening | Thinking | Speaking, Error) => true,
            _ => false,
        }
    }

    /// Terminal for the session instance: a new start re-initializes
    /// from scratch.
    pub fn is_terminal(self) -> bool {
        matches!(self, TurnState::Off | TurnState::Error)
    }

    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

/// Read-only view of a talk session, rendered by the UI collaborator
/// (captions, orb indicator, transient errors).
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub state: TurnState,
    /// Most recent recognized user text
    pub last_user_utterance: Option<String>,
    /// Most recent complete agent reply
    pub last_agent_reply: Option<String>,
    /// User speech currently detected by the capture backend
    pub is_user_speaking: bool,
    /// Transient human-readable error, auto-cleared after a short delay
    pub error: Option<String>,
}

/// Bookkeeping for an in-flight agent turn. Exists between "message
/// sent" and "complete reply observed or timeout".
#[derive(Debug, Clone)]
pub struct PendingReply {
    pub session_id: String,
    pub sent_at: Instant,
    pub poll_attempts: u32,
}

impl PendingReply {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            sent_at: Instant::now(),
            poll_attempts: 0,
        }
    }
}
