//! Session events broadcast to UI subscribers

use talk_core::TurnState;

/// Everything a UI collaborator needs to render talk mode: state for
/// the orb indicator, speech activity for the mic glyph, utterance and
/// reply text for captions.
#[derive(Debug, Clone, PartialEq)]
pub enum TalkEvent {
    /// Session accepted and initializing
    Started { session_id: String },
    /// Turn state machine took an edge
    StateChanged { old: TurnState, new: TurnState },
    /// Capture backend detected speech starting or ending
    UserSpeaking { active: bool },
    /// An utterance finished transcription
    UserUtterance { text: String },
    /// A complete agent reply was accepted for this turn
    AgentReply { text: String },
    /// Playback was cut off by the user speaking
    BargeIn,
    /// Transient, human-readable; cleared from the snapshot after a
    /// short display window
    Error(String),
    /// Session torn down
    Stopped,
}
