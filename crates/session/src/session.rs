//! One voice session: owner task, turn arbitration, stale-result guard
//!
//! The owner task is the only writer of the turn state. Pipeline work
//! (transcription, relay, playback) runs in spawned ops that report
//! back over a channel, each result tagged with the turn epoch that
//! started it. A barge-in or stop bumps the epoch, so a completion
//! from a superseded turn is discarded on arrival instead of steering
//! the state machine.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use talk_config::Settings;
use talk_core::{
    AgentMessage, CaptureEvent, ConversationClient, Result, SessionBinding, SessionSnapshot,
    SpeechToText, TalkError, TurnState, VoiceCapture,
};
use talk_pipeline::{
    BridgeSignal, CaptureBridge, ConversationRelay, PlaybackHandle, PlaybackOutcome,
    SentenceChunker, SpeakerBackend, SpeechPlayback, Transcriber,
};

use crate::events::TalkEvent;
use crate::metrics;

/// Pluggable backends for one session. Production wiring uses the
/// HTTP adapters from `talk-pipeline`; tests substitute mocks.
#[derive(Clone)]
pub struct TalkBackends {
    pub capture: Arc<dyn VoiceCapture>,
    pub stt: Arc<dyn SpeechToText>,
    pub conversation: Arc<dyn ConversationClient>,
    pub speaker: SpeakerBackend,
}

enum Command {
    Stop { ack: oneshot::Sender<()> },
    /// Text injected as if it had been spoken and transcribed
    InjectUtterance { text: String },
    /// Raw samples injected as a capture speech-end event
    InjectAudio { samples: Vec<f32>, sample_rate: u32 },
}

/// Completion of a spawned pipeline op, tagged with the epoch of the
/// turn that started it.
enum OpEvent {
    Transcribed { epoch: u64, result: Result<String> },
    ReplyReady { epoch: u64, result: Result<AgentMessage> },
    PlaybackDone { epoch: u64, result: Result<PlaybackOutcome> },
}

struct SessionShared {
    binding: SessionBinding,
    snapshot: RwLock<SessionSnapshot>,
    event_tx: broadcast::Sender<TalkEvent>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionShared {
    fn emit(&self, event: TalkEvent) {
        let _ = self.event_tx.send(event);
    }
}

/// Handle on a running talk session. Cloneable; the session itself is
/// owned by its spawned task.
#[derive(Clone)]
pub struct TalkSession {
    shared: Arc<SessionShared>,
    cmd_tx: mpsc::Sender<Command>,
}

impl TalkSession {
    /// Validate settings, bring up the pipeline, and spawn the owner
    /// task. Returns as soon as the session is accepted; progress past
    /// Initializing is observable through events and the snapshot.
    pub fn start(
        settings: Settings,
        backends: TalkBackends,
        binding: SessionBinding,
    ) -> Result<TalkSession> {
        settings.validate_for_start()?;

        let bridge = CaptureBridge::new(
            Arc::clone(&backends.capture),
            settings.capture.as_options(),
        );
        let transcriber = Transcriber::new(
            Arc::clone(&backends.stt),
            Duration::from_millis(settings.stt.timeout_ms),
        );
        let relay = ConversationRelay::new(
            Arc::clone(&backends.conversation),
            Duration::from_millis(settings.relay.poll_interval_ms),
            Duration::from_millis(settings.relay.reply_timeout_ms),
        );
        let playback = SpeechPlayback::new(
            backends.speaker.clone(),
            SentenceChunker::new(settings.tts.sentences_per_chunk),
        );

        let (event_tx, _) = broadcast::channel(64);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (op_tx, op_rx) = mpsc::channel(16);

        let shared = Arc::new(SessionShared {
            binding,
            snapshot: RwLock::new(SessionSnapshot::default()),
            event_tx,
            task: Mutex::new(None),
        });

        let owner = Owner {
            shared: Arc::clone(&shared),
            settings,
            bridge,
            transcriber,
            relay,
            playback,
            state: TurnState::Off,
            epoch: 0,
            last_seen_reply: None,
            baseline_ready: false,
            playing: None,
            op_task: None,
            op_tx,
            error_clear: None,
        };
        let task = tokio::spawn(owner.run(cmd_rx, op_rx));
        *shared.task.lock() = Some(task);

        Ok(TalkSession { shared, cmd_tx })
    }

    pub fn session_id(&self) -> &str {
        &self.shared.binding.session_id
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.snapshot.read().clone()
    }

    pub fn state(&self) -> TurnState {
        self.shared.snapshot.read().state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TalkEvent> {
        self.shared.event_tx.subscribe()
    }

    /// Tear the session down: stop playback, release the microphone,
    /// cancel in-flight ops. Resolves once the owner task has exited.
    /// Idempotent.
    pub async fn stop(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(Command::Stop { ack: ack_tx })
            .await
            .is_ok()
        {
            let _ = ack_rx.await;
        }
        let task = self.shared.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    /// Feed text into the turn loop as if it had been spoken. Only
    /// acted on while listening.
    pub async fn inject_utterance(&self, text: impl Into<String>) -> Result<()> {
        self.cmd_tx
            .send(Command::InjectUtterance { text: text.into() })
            .await
            .map_err(|_| TalkError::ChannelClosed)
    }

    /// Feed raw samples into the turn loop as a finished speech
    /// segment.
    pub async fn inject_audio(&self, samples: Vec<f32>, sample_rate: u32) -> Result<()> {
        self.cmd_tx
            .send(Command::InjectAudio {
                samples,
                sample_rate,
            })
            .await
            .map_err(|_| TalkError::ChannelClosed)
    }
}

struct Owner {
    shared: Arc<SessionShared>,
    settings: Settings,
    bridge: CaptureBridge,
    transcriber: Transcriber,
    relay: ConversationRelay,
    playback: SpeechPlayback,
    state: TurnState,
    /// Bumped on barge-in and teardown; ops report under the epoch
    /// they started with
    epoch: u64,
    /// Id of the newest consumed (or pre-existing) assistant message
    last_seen_reply: Option<String>,
    /// Whether `last_seen_reply` reflects an actual fetch; until it
    /// does, each send re-captures the baseline first
    baseline_ready: bool,
    playing: Option<PlaybackHandle>,
    op_task: Option<JoinHandle<()>>,
    op_tx: mpsc::Sender<OpEvent>,
    error_clear: Option<Instant>,
}

impl Owner {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<Command>,
        mut op_rx: mpsc::Receiver<OpEvent>,
    ) {
        let session_id = self.shared.binding.session_id.clone();
        self.shared.emit(TalkEvent::Started {
            session_id: session_id.clone(),
        });
        tracing::info!(%session_id, "talk session starting");

        self.set_state(TurnState::Initializing);
        let mut cap_rx = match self.bridge.start().await {
            Ok(rx) => rx,
            Err(e) => {
                self.fatal(e).await;
                return self.park_in_error(cmd_rx).await;
            },
        };

        // Baseline: a reply that completed before this session started
        // must never be consumed as the first turn's reply.
        match self.relay.latest_assistant_id(&self.shared.binding).await {
            Ok(id) => {
                self.last_seen_reply = id;
                self.baseline_ready = true;
            },
            Err(e) => {
                // Re-captured before the first send instead
                tracing::warn!(%session_id, error = %e, "reply baseline unavailable");
            },
        }

        self.set_state(TurnState::Listening);

        let exit = loop {
            let clear_at = self.error_clear;
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(Command::Stop { ack }) => break LoopExit::Stopped(Some(ack)),
                    None => break LoopExit::Stopped(None),
                    Some(Command::InjectUtterance { text }) => {
                        if self.state == TurnState::Listening {
                            self.set_state(TurnState::Thinking);
                            self.on_transcribed(Ok(text)).await;
                        }
                    },
                    Some(Command::InjectAudio { samples, sample_rate }) => {
                        self.on_capture(CaptureEvent::SpeechEnd { samples, sample_rate }).await;
                    },
                },
                event = cap_rx.recv() => match event {
                    Some(event) => self.on_capture(event).await,
                    None => break LoopExit::CaptureLost,
                },
                Some(op) = op_rx.recv() => self.on_op(op).await,
                _ = async {
                    match clear_at {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => std::future::pending::<()>().await,
                    }
                } => {
                    self.error_clear = None;
                    self.shared.snapshot.write().error = None;
                },
            }
        };

        match exit {
            LoopExit::Stopped(ack) => {
                self.teardown().await;
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
            },
            LoopExit::CaptureLost => {
                self.fatal(TalkError::Capture("capture stream ended".into()))
                    .await;
                self.park_in_error(cmd_rx).await;
            },
        }
    }

    /// After an unrecoverable failure the session stays inert until
    /// explicitly stopped.
    async fn park_in_error(mut self, mut cmd_rx: mpsc::Receiver<Command>) {
        loop {
            match cmd_rx.recv().await {
                Some(Command::Stop { ack }) => {
                    self.teardown().await;
                    let _ = ack.send(());
                    return;
                },
                Some(_) => {},
                None => {
                    self.teardown().await;
                    return;
                },
            }
        }
    }

    async fn on_capture(&mut self, event: CaptureEvent) {
        match self.bridge.translate(self.state, event) {
            BridgeSignal::SpeechStarted => {
                self.shared.snapshot.write().is_user_speaking = true;
                self.shared.emit(TalkEvent::UserSpeaking { active: true });
                if self.state == TurnState::Speaking && self.settings.voice.auto_interrupt {
                    self.barge_in().await;
                }
            },
            BridgeSignal::SpeechDiscarded => {
                self.shared.snapshot.write().is_user_speaking = false;
                self.shared.emit(TalkEvent::UserSpeaking { active: false });
            },
            BridgeSignal::UtteranceReady(utterance) => {
                self.shared.snapshot.write().is_user_speaking = false;
                self.shared.emit(TalkEvent::UserSpeaking { active: false });
                self.set_state(TurnState::Thinking);

                let transcriber = self.transcriber.clone();
                let tx = self.op_tx.clone();
                let epoch = self.epoch;
                self.op_task = Some(tokio::spawn(async move {
                    let result = transcriber.transcribe(&utterance).await.map(|t| t.text);
                    let _ = tx.send(OpEvent::Transcribed { epoch, result }).await;
                }));
            },
        }
    }

    async fn on_op(&mut self, op: OpEvent) {
        let (epoch, op) = match op {
            OpEvent::Transcribed { epoch, result } => (epoch, OpKind::Transcribed(result)),
            OpEvent::ReplyReady { epoch, result } => (epoch, OpKind::ReplyReady(result)),
            OpEvent::PlaybackDone { epoch, result } => (epoch, OpKind::PlaybackDone(result)),
        };
        if epoch != self.epoch {
            tracing::debug!(op_epoch = epoch, epoch = self.epoch, "stale op discarded");
            return;
        }

        match op {
            OpKind::Transcribed(result) => self.on_transcribed(result).await,
            OpKind::ReplyReady(result) => self.on_reply(result).await,
            OpKind::PlaybackDone(result) => self.on_playback_done(result),
        }
    }

    async fn on_transcribed(&mut self, result: Result<String>) {
        // Injected text has not been through the transcriber's trim
        let result = result.map(|text| text.trim().to_string());
        match result {
            Ok(text) if text.is_empty() => {
                // Noise or silence recognized as nothing; no turn
                tracing::debug!("empty transcription, resuming listening");
                self.set_state(TurnState::Listening);
            },
            Ok(text) => {
                self.shared.snapshot.write().last_user_utterance = Some(text.clone());
                self.shared.emit(TalkEvent::UserUtterance { text: text.clone() });

                let relay = self.relay.clone();
                let binding = self.shared.binding.clone();
                let last_seen = self.last_seen_reply.clone();
                let baseline_ready = self.baseline_ready;
                let tx = self.op_tx.clone();
                let epoch = self.epoch;
                // State stays Thinking for the whole send-and-wait
                self.op_task = Some(tokio::spawn(async move {
                    let result = async {
                        // A baseline the startup fetch could not take
                        // is re-captured before the send, so an older
                        // reply is never consumed as this turn's
                        let last_seen = if baseline_ready {
                            last_seen
                        } else {
                            relay.latest_assistant_id(&binding).await.unwrap_or(None)
                        };
                        relay.send(&binding, &text).await?;
                        relay.await_reply(&binding, last_seen.as_deref()).await
                    }
                    .await;
                    let _ = tx.send(OpEvent::ReplyReady { epoch, result }).await;
                }));
            },
            Err(e) => {
                metrics::record_transcription_failure();
                self.recoverable(e);
                self.set_state(TurnState::Listening);
            },
        }
    }

    async fn on_reply(&mut self, result: Result<AgentMessage>) {
        match result {
            Ok(message) => {
                self.last_seen_reply = Some(message.id.clone());
                self.baseline_ready = true;
                let text = message.text();
                if text.is_empty() {
                    tracing::debug!(message_id = %message.id, "reply has no text parts");
                    metrics::record_turn_completed();
                    self.set_state(TurnState::Listening);
                    return;
                }

                self.shared.snapshot.write().last_agent_reply = Some(text.clone());
                self.shared.emit(TalkEvent::AgentReply { text: text.clone() });
                self.set_state(TurnState::Speaking);

                match self.playback.speak(&text) {
                    Ok(handle) => {
                        let waiter = handle.clone();
                        let tx = self.op_tx.clone();
                        let epoch = self.epoch;
                        self.playing = Some(handle);
                        self.op_task = Some(tokio::spawn(async move {
                            let result = waiter.wait().await;
                            let _ = tx.send(OpEvent::PlaybackDone { epoch, result }).await;
                        }));
                    },
                    Err(e) => {
                        // Reply was all markup or whitespace; the turn
                        // still completed
                        tracing::debug!(error = %e, "reply not speakable, skipping playback");
                        metrics::record_turn_completed();
                        self.set_state(TurnState::Listening);
                    },
                }
            },
            Err(e) => {
                metrics::record_relay_failure();
                self.recoverable(e);
                self.set_state(TurnState::Listening);
            },
        }
    }

    fn on_playback_done(&mut self, result: Result<PlaybackOutcome>) {
        self.playing = None;
        match result {
            Ok(PlaybackOutcome::Completed) => {
                metrics::record_reply_spoken();
                metrics::record_turn_completed();
                self.set_state(TurnState::Listening);
            },
            Ok(PlaybackOutcome::Stopped) => {
                // Barge-in bumps the epoch, so reaching here means an
                // external stop of the handle
                self.set_state(TurnState::Listening);
            },
            Err(e) => {
                self.recoverable(e);
                self.set_state(TurnState::Listening);
            },
        }
    }

    /// User spoke over playback: cut speech immediately and listen.
    /// The in-progress utterance becomes the next turn.
    async fn barge_in(&mut self) {
        tracing::info!("barge-in, stopping playback");
        self.epoch += 1;
        if let Some(task) = self.op_task.take() {
            task.abort();
        }
        if let Some(playing) = self.playing.take() {
            playing.stop().await;
        }
        // The cut-off reply is no longer what the user is hearing;
        // drop its caption
        self.shared.snapshot.write().last_agent_reply = None;
        metrics::record_barge_in();
        self.shared.emit(TalkEvent::BargeIn);
        self.set_state(TurnState::Listening);
    }

    fn set_state(&mut self, new: TurnState) {
        if self.state == new {
            return;
        }
        if !self.state.can_transition(new) {
            tracing::warn!(from = ?self.state, to = ?new, "illegal transition suppressed");
            return;
        }
        let old = self.state;
        self.state = new;
        self.shared.snapshot.write().state = new;
        self.shared.emit(TalkEvent::StateChanged { old, new });
        tracing::debug!(?old, ?new, "state changed");
    }

    /// Surface a transient failure without leaving the turn loop.
    fn recoverable(&mut self, e: TalkError) {
        tracing::warn!(error = %e, "recoverable failure");
        let message = e.to_string();
        self.shared.snapshot.write().error = Some(message.clone());
        self.shared.emit(TalkEvent::Error(message));
        self.error_clear =
            Some(Instant::now() + Duration::from_millis(self.settings.ui.error_display_ms));
    }

    /// Unrecoverable failure: cancel everything and enter Error.
    async fn fatal(&mut self, e: TalkError) {
        tracing::error!(error = %e, "fatal failure");
        self.epoch += 1;
        if let Some(task) = self.op_task.take() {
            task.abort();
        }
        if let Some(playing) = self.playing.take() {
            playing.stop().await;
        }
        let message = e.to_string();
        self.shared.snapshot.write().error = Some(message.clone());
        self.shared.emit(TalkEvent::Error(message));
        self.set_state(TurnState::Error);
    }

    async fn teardown(&mut self) {
        tracing::info!(session_id = %self.shared.binding.session_id, "talk session stopping");
        self.epoch += 1;
        if let Some(task) = self.op_task.take() {
            task.abort();
        }
        if let Some(playing) = self.playing.take() {
            playing.stop().await;
        }
        self.bridge.stop().await;
        {
            let mut snapshot = self.shared.snapshot.write();
            snapshot.is_user_speaking = false;
            snapshot.error = None;
        }
        self.set_state(TurnState::Off);
        self.shared.emit(TalkEvent::Stopped);
    }
}

enum LoopExit {
    Stopped(Option<oneshot::Sender<()>>),
    CaptureLost,
}

/// Payload of an [`OpEvent`] after the epoch check.
enum OpKind {
    Transcribed(Result<String>),
    ReplyReady(Result<AgentMessage>),
    PlaybackDone(Result<PlaybackOutcome>),
}
