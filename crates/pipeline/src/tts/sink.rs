//! Audio sink that forwards synthesized clips to a channel.
//!
//! The hosting UI owns the actual audio device; this sink hands each
//! clip over and treats a closed channel as the device going away.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use talk_core::{AudioClip, AudioSink, Result, TalkError};

/// One clip handed to the audio device, paired with an ack the device
/// resolves once the clip has finished playing (or was cut off).
pub struct SinkRequest {
    pub clip: AudioClip,
    pub done: oneshot::Sender<()>,
}

/// Forwards clips over an mpsc channel and waits for the consumer's
/// ack, so in-order playback holds even though the device is remote.
pub struct ChannelSink {
    tx: mpsc::Sender<SinkRequest>,
    in_flight: Mutex<Option<oneshot::Sender<()>>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<SinkRequest>) -> Self {
        Self {
            tx,
            in_flight: Mutex::new(None),
        }
    }

    /// Channel pair for wiring a consumer; `buffer` bounds queued clips.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<SinkRequest>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl AudioSink for ChannelSink {
    async fn play(&self, clip: AudioClip) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        // Track the ack so stop() can release a waiting play()
        let cancel = {
            let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
            *self.in_flight.lock() = Some(cancel_tx);
            cancel_rx
        };

        self.tx
            .send(SinkRequest {
                clip,
                done: done_tx,
            })
            .await
            .map_err(|_| TalkError::Playback("audio output channel closed".into()))?;

        tokio::select! {
            _ = cancel => Ok(()),
            acked = done_rx => {
                self.in_flight.lock().take();
                // A dropped ack means the consumer discarded the clip
                acked.map_err(|_| TalkError::Playback("audio output dropped clip".into()))
            }
        }
    }

    async fn stop(&self) {
        if let Some(cancel) = self.in_flight.lock().take() {
            let _ = cancel.send(());
        }
    }
}
