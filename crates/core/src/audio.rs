//! Utterance and audio payload types

use std::sync::Arc;

/// A bounded span of captured audio representing one user turn.
///
/// Created on a VAD speech-end event, consumed exactly once by the
/// transcription dispatcher, never persisted.
#[derive(Debug, Clone)]
pub struct Utterance {
    /// Raw samples, f32 normalized to [-1.0, 1.0], mono
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl Utterance {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Duration derived from sample count and rate.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Synthesized audio as returned by a network TTS backend.
///
/// Opaque container bytes; the audio sink is responsible for decoding.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub bytes: Arc<[u8]>,
    /// Content type reported by the synthesis backend, e.g. "audio/wav"
    pub content_type: String,
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
