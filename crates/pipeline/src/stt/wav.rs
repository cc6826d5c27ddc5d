//! In-memory WAV encoding for STT dispatch

use std::io::Cursor;

use talk_core::{Result, TalkError};

/// Encode f32 samples as a mono 16-bit PCM WAV container.
///
/// Samples are clamped to [-1.0, 1.0] before quantization so clipped
/// capture input cannot wrap around.
pub fn encode_wav_pcm16(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    if sample_rate == 0 {
        return Err(TalkError::Transcription("invalid sample rate 0".into()));
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| TalkError::Transcription(format!("wav writer: {e}")))?;
        for &sample in samples {
            let clamped = sample.clamp(-1.0, 1.0);
            let quantized = (clamped * i16::MAX as f32) as i16;
            writer
                .write_sample(quantized)
                .map_err(|e| TalkError::Transcription(format!("wav write: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| TalkError::Transcription(format!("wav finalize: {e}")))?;
    }

    Ok(cursor.into_inner())
}
