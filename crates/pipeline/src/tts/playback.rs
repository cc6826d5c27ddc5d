//! Playback queue and pipeline runner
//!
//! Strict in-order playback with one-chunk look-ahead prefetch.
//! Prefetch advances readiness only, never playback order; a single
//! idempotent stop aborts in-flight synthesis, halts the sink, and
//! discards every queued chunk.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

use talk_core::{AudioClip, AudioSink, LocalSpeech, Result, TalkError, TextToSpeech};

use super::chunker::SentenceChunker;
use super::sanitize::sanitize_for_speech;

/// Lifecycle of one queued chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Pending,
    Fetching,
    Ready,
    Playing,
    Consumed,
}

#[derive(Debug)]
struct QueuedChunk {
    text: String,
    state: ChunkState,
}

/// Ordered chunks derived from one agent reply.
#[derive(Debug, Default)]
pub struct PlaybackQueue {
    chunks: Vec<QueuedChunk>,
}

impl PlaybackQueue {
    fn new(texts: Vec<String>) -> Self {
        Self {
            chunks: texts
                .into_iter()
                .map(|text| QueuedChunk {
                    text,
                    state: ChunkState::Pending,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn states(&self) -> Vec<ChunkState> {
        self.chunks.iter().map(|c| c.state).collect()
    }

    fn text(&self, index: usize) -> Option<String> {
        self.chunks.get(index).map(|c| c.text.clone())
    }

    fn set_state(&mut self, index: usize, state: ChunkState) {
        if let Some(chunk) = self.chunks.get_mut(index) {
            chunk.state = state;
        }
    }

    fn clear(&mut self) {
        self.chunks.clear();
    }
}

/// How playback ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// All chunks played
    Completed,
    /// Stopped by barge-in, explicit stop, or teardown
    Stopped,
}

/// Synthesis backend driving playback.
#[derive(Clone)]
pub enum SpeakerBackend {
    /// Network synthesizer: chunked with prefetch, audio routed to a sink
    Remote {
        tts: Arc<dyn TextToSpeech>,
        sink: Arc<dyn AudioSink>,
    },
    /// Local/offline synthesizer: speaks the whole text in one pass
    Local {
        speech: Arc<dyn LocalSpeech>,
        voice: Option<String>,
        rate: f32,
    },
}

struct PlaybackShared {
    queue: Mutex<PlaybackQueue>,
    stop_tx: watch::Sender<bool>,
    outcome: Mutex<Option<Result<PlaybackOutcome>>>,
    finished: AtomicBool,
    done: Notify,
}

impl PlaybackShared {
    fn set_chunk_state(&self, index: usize, state: ChunkState) {
        self.queue.lock().set_state(index, state);
    }

    async fn wait_done(&self) {
        loop {
            let notified = self.done.notified();
            if self.finished.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }
}

/// Handle on one in-progress reply playback.
#[derive(Clone)]
pub struct PlaybackHandle {
    shared: Arc<PlaybackShared>,
}

impl PlaybackHandle {
    /// Stop playback: abort in-flight synthesis, halt the audio
    /// resource, discard queued chunks. Idempotent; resolves once the
    /// runner has released everything.
    pub async fn stop(&self) {
        let _ = self.shared.stop_tx.send(true);
        self.shared.wait_done().await;
    }

    /// Resolve once playback ends, with the outcome or the playback
    /// error that aborted it.
    pub async fn wait(&self) -> Result<PlaybackOutcome> {
        self.shared.wait_done().await;
        self.shared
            .outcome
            .lock()
            .clone()
            .unwrap_or(Ok(PlaybackOutcome::Stopped))
    }

    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::Acquire)
    }

    /// Chunks still held by the queue (zero after a stop).
    pub fn queue_len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    pub fn chunk_states(&self) -> Vec<ChunkState> {
        self.shared.queue.lock().states()
    }
}

/// Uniform start/stop surface over both synthesis backends.
#[derive(Clone)]
pub struct SpeechPlayback {
    backend: SpeakerBackend,
    chunker: SentenceChunker,
}

impl SpeechPlayback {
    pub fn new(backend: SpeakerBackend, chunker: SentenceChunker) -> Self {
        Self { backend, chunker }
    }

    /// Start speaking a completed agent reply. Fails upfront if
    /// sanitization leaves nothing speakable.
    pub fn speak(&self, reply: &str) -> Result<PlaybackHandle> {
        let sanitized = sanitize_for_speech(reply);
        if sanitized.is_empty() {
            return Err(TalkError::Playback(
                "reply has no speakable content".into(),
            ));
        }

        let texts = match &self.backend {
            SpeakerBackend::Remote { .. } => self.chunker.chunk(&sanitized),
            // Local synthesis needs no network chunking
            SpeakerBackend::Local { .. } => vec![sanitized],
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        let shared = Arc::new(PlaybackShared {
            queue: Mutex::new(PlaybackQueue::new(texts)),
            stop_tx,
            outcome: Mutex::new(None),
            finished: AtomicBool::new(false),
            done: Notify::new(),
        });

        let backend = self.backend.clone();
        let runner_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            let result = match backend {
                SpeakerBackend::Remote { tts, sink } => {
                    run_remote(tts, sink, &runner_shared, stop_rx).await
                },
                SpeakerBackend::Local {
                    speech,
                    voice,
                    rate,
                } => run_local(speech, voice, rate, &runner_shared, stop_rx).await,
            };

            match &result {
                Ok(PlaybackOutcome::Completed) => {
                    tracing::debug!("playback completed");
                },
                Ok(PlaybackOutcome::Stopped) | Err(_) => {
                    runner_shared.queue.lock().clear();
                },
            }

            *runner_shared.outcome.lock() = Some(result);
            runner_shared.finished.store(true, Ordering::Release);
            runner_shared.done.notify_waiters();
        });

        Ok(PlaybackHandle { shared })
    }
}

/// Resolves once the stop flag is raised.
async fn stopped(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            // Sender lives in PlaybackShared, which outlives the runner
            std::future::pending::<()>().await;
        }
    }
}

async fn run_remote(
    tts: Arc<dyn TextToSpeech>,
    sink: Arc<dyn AudioSink>,
    shared: &PlaybackShared,
    mut stop_rx: watch::Receiver<bool>,
) -> Result<PlaybackOutcome> {
    let total = shared.queue.lock().len();
    let mut prefetch: Option<(usize, JoinHandle<Result<AudioClip>>)> = None;

    for index in 0..total {
        if *stop_rx.borrow_and_update() {
            if let Some((_, handle)) = prefetch.take() {
                handle.abort();
            }
            sink.stop().await;
            return Ok(PlaybackOutcome::Stopped);
        }

        let text = match shared.queue.lock().text(index) {
            Some(text) => text,
            // Queue cleared under us: a stop raced ahead
            None => return Ok(PlaybackOutcome::Stopped),
        };

        // Resolve audio: prefetched if its fetch succeeded, otherwise a
        // synchronous fetch (which is also the prefetch-failure retry).
        let mut clip: Option<AudioClip> = None;
        if let Some((prefetched_index, mut handle)) = prefetch.take() {
            debug_assert_eq!(prefetched_index, index);
            let mut interrupted = false;
            tokio::select! {
                _ = stopped(&mut stop_rx) => interrupted = true,
                joined = &mut handle => match joined {
                    Ok(Ok(audio)) => clip = Some(audio),
                    Ok(Err(e)) => {
                        tracing::warn!(chunk = index, error = %e, "prefetch failed, retrying");
                    },
                    Err(e) => {
                        tracing::warn!(chunk = index, error = %e, "prefetch task failed, retrying");
                    },
                }
            }
            if interrupted {
                handle.abort();
                sink.stop().await;
                return Ok(PlaybackOutcome::Stopped);
            }
        }

        let clip = match clip {
            Some(clip) => clip,
            None => {
                shared.set_chunk_state(index, ChunkState::Fetching);
                tokio::select! {
                    _ = stopped(&mut stop_rx) => {
                        sink.stop().await;
                        return Ok(PlaybackOutcome::Stopped);
                    }
                    fetched = tts.synthesize(&text) => fetched?,
                }
            },
        };
        shared.set_chunk_state(index, ChunkState::Ready);

        // Chain the next fetch forward as this chunk starts playing;
        // a single fetch in flight at a time. The lookup must release
        // the queue lock before the state update takes it again.
        if index + 1 < total {
            let next_text = shared.queue.lock().text(index + 1);
            if let Some(next_text) = next_text {
                shared.set_chunk_state(index + 1, ChunkState::Fetching);
                let tts = Arc::clone(&tts);
                prefetch = Some((
                    index + 1,
                    tokio::spawn(async move { tts.synthesize(&next_text).await }),
                ));
            }
        }

        shared.set_chunk_state(index, ChunkState::Playing);
        tokio::select! {
            _ = stopped(&mut stop_rx) => {
                if let Some((_, handle)) = prefetch.take() {
                    handle.abort();
                }
                sink.stop().await;
                return Ok(PlaybackOutcome::Stopped);
            }
            played = sink.play(clip) => {
                if let Err(e) = played {
                    if let Some((_, handle)) = prefetch.take() {
                        handle.abort();
                    }
                    sink.stop().await;
                    return Err(e);
                }
            }
        }
        shared.set_chunk_state(index, ChunkState::Consumed);
    }

    Ok(PlaybackOutcome::Completed)
}

async fn run_local(
    speech: Arc<dyn LocalSpeech>,
    voice: Option<String>,
    rate: f32,
    shared: &PlaybackShared,
    mut stop_rx: watch::Receiver<bool>,
) -> Result<PlaybackOutcome> {
    let text = match shared.queue.lock().text(0) {
        Some(text) => text,
        None => return Ok(PlaybackOutcome::Stopped),
    };

    shared.set_chunk_state(0, ChunkState::Playing);
    tokio::select! {
        _ = stopped(&mut stop_rx) => {
            speech.stop().await;
            return Ok(PlaybackOutcome::Stopped);
        }
        spoken = speech.speak(&text, voice.as_deref(), rate) => spoken?,
    }
    shared.set_chunk_state(0, ChunkState::Consumed);
    Ok(PlaybackOutcome::Completed)
}
