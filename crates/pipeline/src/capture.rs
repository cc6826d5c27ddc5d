//! Capture bridge
//!
//! Translates the VAD backend's primitives (speech-start, speech-end,
//! misfire) into the two signals the orchestrator needs: "utterance
//! ready" while listening, and "user started speaking" for barge-in.
//! Thresholds are forwarded to the backend untouched.

use std::sync::Arc;
use tokio::sync::mpsc;

use talk_core::{CaptureEvent, CaptureOptions, Result, TurnState, Utterance, VoiceCapture};

/// Signal produced from one VAD event, given the current turn state.
#[derive(Debug, Clone)]
pub enum BridgeSignal {
    /// User started speaking. Drives the `is_user_speaking` flag and,
    /// while speaking with auto-interrupt on, barge-in.
    SpeechStarted,
    /// Speech ended without producing a turn (wrong state, below the
    /// minimum duration, or a misfire).
    SpeechDiscarded,
    /// A bounded utterance ready for transcription.
    UtteranceReady(Utterance),
}

/// Adapts a continuous [`VoiceCapture`] stream into discrete signals.
pub struct CaptureBridge {
    capture: Arc<dyn VoiceCapture>,
    options: CaptureOptions,
}

impl CaptureBridge {
    pub fn new(capture: Arc<dyn VoiceCapture>, options: CaptureOptions) -> Self {
        Self { capture, options }
    }

    /// Start the capture backend. Resolves once capture is live; the
    /// returned receiver carries raw VAD events.
    pub async fn start(&self) -> Result<mpsc::Receiver<CaptureEvent>> {
        let (tx, rx) = mpsc::channel(64);
        self.capture.start(self.options, tx).await?;
        tracing::info!(
            silence_threshold_ms = self.options.silence_threshold_ms,
            min_speech_ms = self.options.min_speech_ms,
            "capture started"
        );
        Ok(rx)
    }

    /// Release the microphone stream.
    pub async fn stop(&self) {
        self.capture.stop().await;
    }

    /// Map one VAD event to an orchestrator signal.
    ///
    /// Speech ending while not listening is not a new turn; utterances
    /// below `min_speech_ms` are noise. Both are discarded without
    /// side effects.
    pub fn translate(&self, state: TurnState, event: CaptureEvent) -> BridgeSignal {
        match event {
            CaptureEvent::SpeechStart => BridgeSignal::SpeechStarted,
            CaptureEvent::Misfire => BridgeSignal::SpeechDiscarded,
            CaptureEvent::SpeechEnd {
                samples,
                sample_rate,
            } => {
                if state != TurnState::Listening {
                    tracing::debug!(?state, "discarding speech-end outside listening");
                    return BridgeSignal::SpeechDiscarded;
                }
                let utterance = Utterance::new(samples, sample_rate);
                if utterance.duration_ms() < self.options.min_speech_ms as u64 {
                    tracing::debug!(
                        duration_ms = utterance.duration_ms(),
                        min_speech_ms = self.options.min_speech_ms,
                        "discarding too-short utterance"
                    );
                    return BridgeSignal::SpeechDiscarded;
                }
                BridgeSignal::UtteranceReady(utterance)
            },
        }
    }
}
