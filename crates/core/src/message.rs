//! Agent session message types
//!
//! The talk session's only visibility into the agent is its message
//! list; these types mirror that boundary.

use serde::{Deserialize, Serialize};

/// Binding to the agent session a talk session drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBinding {
    /// Identifier of the underlying agent session
    pub session_id: String,
    /// Base address of the agent session's message API
    pub endpoint: String,
    /// Working directory / context qualifier, if the agent is scoped to one
    #[serde(default)]
    pub directory: Option<String>,
}

impl SessionBinding {
    pub fn new(session_id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            endpoint: endpoint.into(),
            directory: None,
        }
    }

    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = Some(directory.into());
        self
    }
}

/// Author of an agent session message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One content part of an agent message. Only text parts matter to the
/// orchestrator; everything else (tool calls, attachments) is opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessagePart {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// A role-tagged message from the agent session's message list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub id: String,
    pub role: MessageRole,
    /// Completion marker: generation for this message has finished
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

impl AgentMessage {
    /// Concatenated text content, trimmed. Non-text parts are skipped.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            if let MessagePart::Text { text } = part {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(parts: Vec<MessagePart>) -> AgentMessage {
        AgentMessage {
            id: "msg-1".into(),
            role: MessageRole::Assistant,
            completed: true,
            parts,
        }
    }

    #[test]
    fn test_text_concatenation() {
        let m = msg(vec![
            MessagePart::Text {
                text: "Hello.".into(),
            },
            MessagePart::Other,
            MessagePart::Text {
                text: "World.".into(),
            },
        ]);
        assert_eq!(m.text(), "Hello.\nWorld.");
    }

    #[test]
    fn test_text_empty_and_whitespace() {
        assert_eq!(msg(vec![]).text(), "");
        let m = msg(vec![MessagePart::Text {
            text: "   ".into(),
        }]);
        assert_eq!(m.text(), "");
    }

    #[test]
    fn test_unknown_part_types_tolerated() {
        let m: AgentMessage = serde_json::from_value(serde_json::json!({
            "id": "msg-2",
            "role": "assistant",
            "completed": true,
            "parts": [
                { "type": "tool", "tool": "bash" },
                { "type": "text", "text": "Done." },
            ],
        }))
        .unwrap();
        assert_eq!(m.parts.len(), 2);
        assert_eq!(m.text(), "Done.");
    }

    #[test]
    fn test_binding_builder() {
        let b = SessionBinding::new("ses_1", "http://127.0.0.1:4096")
            .with_directory("/home/user/project");
        assert_eq!(b.directory.as_deref(), Some("/home/user/project"));
    }
}
