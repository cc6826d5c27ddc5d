//! Transcription dispatcher
//!
//! Encodes a captured utterance into a WAV container (mono, 16-bit
//! PCM) and dispatches it to the speech-to-text boundary with an
//! overall timeout. Failures here are never fatal to the session.

mod http;
mod wav;

pub use http::{HttpStt, HttpSttConfig};
pub use wav::encode_wav_pcm16;

use std::sync::Arc;
use std::time::Duration;

use talk_core::{Result, SpeechToText, TalkError, Transcript, Utterance};

/// Dispatches utterances to the STT boundary.
#[derive(Clone)]
pub struct Transcriber {
    stt: Arc<dyn SpeechToText>,
    timeout: Duration,
}

impl Transcriber {
    pub fn new(stt: Arc<dyn SpeechToText>, timeout: Duration) -> Self {
        Self { stt, timeout }
    }

    /// Recognize one utterance. The returned text is trimmed; empty
    /// text means "nothing said" and the caller treats the turn as a
    /// no-op.
    pub async fn transcribe(&self, utterance: &Utterance) -> Result<Transcript> {
        let wav = encode_wav_pcm16(&utterance.samples, utterance.sample_rate)?;
        tracing::debug!(
            duration_ms = utterance.duration_ms(),
            wav_bytes = wav.len(),
            "dispatching utterance to STT"
        );

        let result = tokio::time::timeout(self.timeout, self.stt.transcribe(wav)).await;

        match result {
            Ok(Ok(mut transcript)) => {
                transcript.text = transcript.text.trim().to_string();
                tracing::info!(
                    text = %transcript.text,
                    language = transcript.language.as_deref().unwrap_or("unknown"),
                    "transcription complete"
                );
                Ok(transcript)
            },
            Ok(Err(e)) => Err(TalkError::Transcription(e.to_string())),
            Err(_) => Err(TalkError::Transcription(format!(
                "timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}
