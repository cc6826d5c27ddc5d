//! Speech playback pipeline
//!
//! Turns a completed agent reply into spoken audio: sanitize the text
//! for speech, split it into sentence-bounded chunks, synthesize with
//! one-chunk look-ahead prefetch, and play strictly in order. A single
//! idempotent stop aborts synthesis, halts the sink, and discards the
//! queue. A local/offline backend bypasses chunking and speaks the
//! whole sanitized text in one pass behind the same start/stop surface.

pub mod chunker;
mod http;
mod playback;
pub mod sanitize;
mod sink;

pub use chunker::SentenceChunker;
pub use http::{HttpTts, HttpTtsConfig};
pub use playback::{
    ChunkState, PlaybackHandle, PlaybackOutcome, PlaybackQueue, SpeakerBackend, SpeechPlayback,
};
pub use sink::{ChannelSink, SinkRequest};
