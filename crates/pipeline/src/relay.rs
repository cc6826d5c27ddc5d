//! Conversation relay
//!
//! Delivers recognized user text to the agent session and detects
//! completion of exactly one resulting reply. The agent boundary
//! offers no push notification, so completion is observed by polling
//! the session's message list at a fixed cadence; the poll loop is a
//! plain future, so dropping it (session stop, barge-in, teardown)
//! cancels polling immediately.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use talk_core::{
    AgentMessage, ConversationClient, MessagePart, MessageRole, PendingReply, Result,
    SessionBinding, TalkError,
};

/// Relay over an abstract conversation client.
#[derive(Clone)]
pub struct ConversationRelay {
    client: Arc<dyn ConversationClient>,
    poll_interval: Duration,
    reply_timeout: Duration,
}

impl ConversationRelay {
    pub fn new(
        client: Arc<dyn ConversationClient>,
        poll_interval: Duration,
        reply_timeout: Duration,
    ) -> Self {
        Self {
            client,
            poll_interval,
            reply_timeout,
        }
    }

    /// Post the user's text as a new message on the bound session.
    pub async fn send(&self, binding: &SessionBinding, text: &str) -> Result<()> {
        self.client
            .send_message(binding, text)
            .await
            .map_err(|e| TalkError::Relay(e.to_string()))?;
        tracing::info!(session_id = %binding.session_id, chars = text.len(), "message sent");
        Ok(())
    }

    /// Identifier of the newest completed assistant message, if any.
    ///
    /// Captured before sending so a reply that completed in an earlier
    /// life of the agent session is never mistaken for the new one.
    pub async fn latest_assistant_id(&self, binding: &SessionBinding) -> Result<Option<String>> {
        let messages = self
            .client
            .list_messages(binding)
            .await
            .map_err(|e| TalkError::Relay(e.to_string()))?;
        Ok(latest_completed_assistant(&messages, None).map(|m| m.id))
    }

    /// Poll until a completed assistant message with an id different
    /// from `last_seen_id` appears, or the reply timeout expires.
    ///
    /// Transient list failures are logged and retried on the next
    /// tick; only timeout expiry surfaces an error.
    pub async fn await_reply(
        &self,
        binding: &SessionBinding,
        last_seen_id: Option<&str>,
    ) -> Result<AgentMessage> {
        let mut pending = PendingReply::new(&binding.session_id);
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick fires immediately; skip it so the agent has
        // one interval to start composing before the first fetch.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            if pending.sent_at.elapsed() >= self.reply_timeout {
                return Err(TalkError::Relay(format!(
                    "no reply after {}ms ({} polls)",
                    self.reply_timeout.as_millis(),
                    pending.poll_attempts
                )));
            }

            pending.poll_attempts += 1;
            match self.client.list_messages(binding).await {
                Ok(messages) => {
                    if let Some(reply) = latest_completed_assistant(&messages, last_seen_id) {
                        tracing::info!(
                            session_id = %binding.session_id,
                            message_id = %reply.id,
                            polls = pending.poll_attempts,
                            "reply complete"
                        );
                        return Ok(reply);
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        session_id = %binding.session_id,
                        attempt = pending.poll_attempts,
                        error = %e,
                        "poll failed, retrying"
                    );
                },
            }
        }
    }
}

/// Newest assistant message that carries the completion marker and is
/// not the already-consumed `last_seen_id`.
fn latest_completed_assistant(
    messages: &[AgentMessage],
    last_seen_id: Option<&str>,
) -> Option<AgentMessage> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::Assistant && m.completed)
        .filter(|m| Some(m.id.as_str()) != last_seen_id)
        .cloned()
}

/// HTTP conversation client configuration
#[derive(Debug, Clone)]
pub struct HttpConversationConfig {
    /// Request timeout for send and list calls
    pub timeout_ms: u64,
}

impl Default for HttpConversationConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    parts: Vec<SendPart<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    directory: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SendPart<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

/// Message shape on the wire: metadata under `info`, content under
/// `parts`, completion as a timestamp on `info.time.completed`.
#[derive(Debug, Deserialize)]
struct WireMessage {
    info: WireInfo,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Deserialize)]
struct WireInfo {
    id: String,
    role: String,
    #[serde(default)]
    time: WireTime,
}

#[derive(Debug, Default, Deserialize)]
struct WireTime {
    #[serde(default)]
    completed: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WirePart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl WireMessage {
    fn into_message(self) -> Option<AgentMessage> {
        let role = match self.info.role.as_str() {
            "assistant" => MessageRole::Assistant,
            "user" => MessageRole::User,
            other => {
                tracing::debug!(role = other, "skipping message with unknown role");
                return None;
            },
        };
        let parts = self
            .parts
            .into_iter()
            .map(|p| match (p.kind.as_str(), p.text) {
                ("text", Some(text)) => MessagePart::Text { text },
                _ => MessagePart::Other,
            })
            .collect();
        Some(AgentMessage {
            id: self.info.id,
            role,
            completed: self.info.time.completed.is_some(),
            parts,
        })
    }
}

/// Conversation boundary over the agent's HTTP message API.
pub struct HttpConversation {
    client: reqwest::Client,
}

impl HttpConversation {
    pub fn new(config: HttpConversationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| {
                TalkError::Configuration(format!("failed to build conversation client: {e}"))
            })?;
        Ok(Self { client })
    }

    fn message_url(binding: &SessionBinding) -> String {
        format!(
            "{}/session/{}/message",
            binding.endpoint.trim_end_matches('/'),
            binding.session_id
        )
    }
}

#[async_trait]
impl ConversationClient for HttpConversation {
    async fn send_message(&self, binding: &SessionBinding, text: &str) -> Result<()> {
        let request = SendMessageRequest {
            parts: vec![SendPart { kind: "text", text }],
            directory: binding.directory.as_deref(),
        };

        let response = self
            .client
            .post(Self::message_url(binding))
            .json(&request)
            .send()
            .await
            .map_err(|e| TalkError::Relay(format!("send failed: {e}")))?;

        if !response.status().is_success() {
            return Err(TalkError::Relay(format!(
                "send rejected with {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn list_messages(&self, binding: &SessionBinding) -> Result<Vec<AgentMessage>> {
        let mut request = self.client.get(Self::message_url(binding));
        if let Some(directory) = binding.directory.as_deref() {
            request = request.query(&[("directory", directory)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TalkError::Relay(format!("list failed: {e}")))?;

        if !response.status().is_success() {
            return Err(TalkError::Relay(format!(
                "list returned {}",
                response.status()
            )));
        }

        let wire: Vec<WireMessage> = response
            .json()
            .await
            .map_err(|e| TalkError::Relay(format!("invalid message list: {e}")))?;

        Ok(wire.into_iter().filter_map(WireMessage::into_message).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn assistant(id: &str, completed: bool, text: &str) -> AgentMessage {
        AgentMessage {
            id: id.into(),
            role: MessageRole::Assistant,
            completed,
            parts: vec![MessagePart::Text { text: text.into() }],
        }
    }

    fn user(id: &str, text: &str) -> AgentMessage {
        AgentMessage {
            id: id.into(),
            role: MessageRole::User,
            completed: true,
            parts: vec![MessagePart::Text { text: text.into() }],
        }
    }

    #[test]
    fn test_latest_completed_assistant_picks_newest() {
        let messages = vec![
            assistant("a1", true, "old"),
            user("u1", "question"),
            assistant("a2", true, "new"),
        ];
        let found = latest_completed_assistant(&messages, None).unwrap();
        assert_eq!(found.id, "a2");
    }

    #[test]
    fn test_incomplete_reply_not_returned() {
        let messages = vec![user("u1", "question"), assistant("a1", false, "typing...")];
        assert!(latest_completed_assistant(&messages, None).is_none());
    }

    #[test]
    fn test_dedup_by_last_seen_id() {
        let messages = vec![assistant("a1", true, "already spoken")];
        assert!(latest_completed_assistant(&messages, Some("a1")).is_none());
        assert!(latest_completed_assistant(&messages, Some("a0")).is_some());
    }

    #[test]
    fn test_wire_message_mapping() {
        let json = r#"{
            "info": {"id": "msg_1", "role": "assistant", "time": {"created": 1, "completed": 2}},
            "parts": [
                {"type": "text", "text": "Two plus two equals four."},
                {"type": "tool", "tool": "bash"}
            ]
        }"#;
        let wire: WireMessage = serde_json::from_str(json).unwrap();
        let message = wire.into_message().unwrap();
        assert_eq!(message.id, "msg_1");
        assert!(message.completed);
        assert_eq!(message.text(), "Two plus two equals four.");
    }

    #[test]
    fn test_wire_message_incomplete_and_unknown_role() {
        let json = r#"{"info": {"id": "m", "role": "assistant", "time": {"created": 1}}}"#;
        let wire: WireMessage = serde_json::from_str(json).unwrap();
        assert!(!wire.into_message().unwrap().completed);

        let json = r#"{"info": {"id": "m", "role": "system"}}"#;
        let wire: WireMessage = serde_json::from_str(json).unwrap();
        assert!(wire.into_message().is_none());
    }

    /// Client whose message list fills in over successive polls.
    struct ScriptedClient {
        lists: Mutex<Vec<Vec<AgentMessage>>>,
        polls: Mutex<u32>,
    }

    #[async_trait]
    impl ConversationClient for ScriptedClient {
        async fn send_message(&self, _binding: &SessionBinding, _text: &str) -> Result<()> {
            Ok(())
        }

        async fn list_messages(&self, _binding: &SessionBinding) -> Result<Vec<AgentMessage>> {
            *self.polls.lock() += 1;
            let mut lists = self.lists.lock();
            if lists.len() > 1 {
                Ok(lists.remove(0))
            } else {
                Ok(lists[0].clone())
            }
        }
    }

    fn binding() -> SessionBinding {
        SessionBinding::new("ses_1", "http://127.0.0.1:4096")
    }

    #[tokio::test]
    async fn test_await_reply_polls_until_complete() {
        let client = Arc::new(ScriptedClient {
            lists: Mutex::new(vec![
                vec![user("u1", "hi")],
                vec![user("u1", "hi"), assistant("a1", false, "...")],
                vec![user("u1", "hi"), assistant("a1", true, "hello")],
            ]),
            polls: Mutex::new(0),
        });
        let relay = ConversationRelay::new(
            client.clone(),
            Duration::from_millis(5),
            Duration::from_secs(1),
        );
        let reply = relay.await_reply(&binding(), None).await.unwrap();
        assert_eq!(reply.id, "a1");
        assert!(*client.polls.lock() >= 3);
    }

    #[tokio::test]
    async fn test_await_reply_times_out() {
        let client = Arc::new(ScriptedClient {
            lists: Mutex::new(vec![vec![user("u1", "hi")]]),
            polls: Mutex::new(0),
        });
        let relay = ConversationRelay::new(
            client,
            Duration::from_millis(5),
            Duration::from_millis(40),
        );
        let err = relay.await_reply(&binding(), None).await.unwrap_err();
        assert!(matches!(err, TalkError::Relay(_)));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_await_reply_skips_already_seen() {
        let client = Arc::new(ScriptedClient {
            lists: Mutex::new(vec![vec![assistant("a1", true, "old")]]),
            polls: Mutex::new(0),
        });
        let relay = ConversationRelay::new(
            client,
            Duration::from_millis(5),
            Duration::from_millis(40),
        );
        // The only completed reply is the one we already consumed
        let err = relay.await_reply(&binding(), Some("a1")).await.unwrap_err();
        assert!(matches!(err, TalkError::Relay(_)));
    }

    #[tokio::test]
    async fn test_latest_assistant_id_baseline() {
        let client = Arc::new(ScriptedClient {
            lists: Mutex::new(vec![vec![assistant("a7", true, "earlier reply")]]),
            polls: Mutex::new(0),
        });
        let relay = ConversationRelay::new(
            client,
            Duration::from_millis(5),
            Duration::from_secs(1),
        );
        let id = relay.latest_assistant_id(&binding()).await.unwrap();
        assert_eq!(id.as_deref(), Some("a7"));
    }
}
