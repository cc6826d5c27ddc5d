//! Talk-mode lifecycle: at most one active session
//!
//! Starting while a session is live tears the old one down first, so
//! toggling talk mode is always a clean restart.

use std::sync::Arc;

use tokio::sync::Mutex;

use talk_config::{Settings, TtsBackendKind};
use talk_core::{AudioSink, LocalSpeech, Result, SessionBinding, TalkError, VoiceCapture};
use talk_pipeline::{
    HttpConversation, HttpConversationConfig, HttpStt, HttpSttConfig, HttpTts, HttpTtsConfig,
    SpeakerBackend,
};

use crate::session::{TalkBackends, TalkSession};

impl TalkBackends {
    /// Production wiring: HTTP adapters for transcription, synthesis,
    /// and the conversation API. Capture and audio output are platform
    /// resources the host supplies; a local speech backend is only
    /// required when the settings select it.
    pub fn http(
        settings: &Settings,
        capture: Arc<dyn VoiceCapture>,
        sink: Arc<dyn AudioSink>,
        local: Option<Arc<dyn LocalSpeech>>,
        conversation: HttpConversationConfig,
    ) -> Result<Self> {
        let stt = Arc::new(HttpStt::new(HttpSttConfig {
            url: settings.stt.url.clone(),
            model: settings.stt.model.clone(),
            language: settings.stt.language.clone(),
            timeout_ms: settings.stt.timeout_ms,
        })?);

        let speaker = match settings.tts.backend {
            TtsBackendKind::Remote => SpeakerBackend::Remote {
                tts: Arc::new(HttpTts::new(HttpTtsConfig {
                    url: settings.tts.url.clone(),
                    voice: settings.tts.voice.clone(),
                    rate: settings.tts.rate,
                    timeout_ms: settings.tts.timeout_ms,
                })?),
                sink,
            },
            TtsBackendKind::Local => SpeakerBackend::Local {
                speech: local.ok_or_else(|| {
                    TalkError::Configuration(
                        "tts.backend is \"local\" but no local speech backend is available".into(),
                    )
                })?,
                voice: settings.tts.voice.clone(),
                rate: settings.tts.rate,
            },
        };

        Ok(Self {
            capture,
            stt,
            conversation: Arc::new(HttpConversation::new(conversation)?),
            speaker,
        })
    }
}

/// Owns the single active talk session.
pub struct TalkMode {
    settings: Settings,
    backends: TalkBackends,
    active: Mutex<Option<TalkSession>>,
}

impl TalkMode {
    pub fn new(settings: Settings, backends: TalkBackends) -> Self {
        Self {
            settings,
            backends,
            active: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Start a session bound to `binding`. Any existing session is
    /// fully stopped first; its microphone and audio output are
    /// released before the new one initializes.
    pub async fn start(&self, binding: SessionBinding) -> Result<TalkSession> {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            tracing::info!(
                session_id = %previous.session_id(),
                "stopping previous session before restart"
            );
            previous.stop().await;
        }

        let session = TalkSession::start(self.settings.clone(), self.backends.clone(), binding)?;
        *active = Some(session.clone());
        Ok(session)
    }

    /// Stop the active session, if any. Idempotent.
    pub async fn stop(&self) {
        let session = self.active.lock().await.take();
        if let Some(session) = session {
            session.stop().await;
        }
    }

    /// Handle on the active session, if one is running.
    pub async fn active(&self) -> Option<TalkSession> {
        self.active.lock().await.clone()
    }

    pub async fn is_active(&self) -> bool {
        match self.active.lock().await.as_ref() {
            Some(session) => session.state().is_active(),
            None => false,
        }
    }
}
