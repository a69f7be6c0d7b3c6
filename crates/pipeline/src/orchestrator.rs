//! Call orchestration state machine
//!
//! One [`CallOrchestrator`] actor per session owns all continuous-call
//! state: the transcriber link, the accumulated partial transcript, the
//! pending-utterance queue, and the turn phase. Every input (transport
//! command, link event, completed turn step, timer) arrives on a single
//! mpsc channel, so state transitions are single-writer by construction
//! and need no locks.
//!
//! A turn cycle runs one final transcript through reply generation
//! (bounded by a timeout) and speech synthesis. While a turn is in flight,
//! new final transcripts queue FIFO and are drained one per completed
//! synthesis, oldest first. The `Speaking` phase doubles as the
//! half-duplex guard: no captured audio is forwarded to the transcriber
//! while synthesized speech is being played back, because there is no
//! acoustic echo cancellation in front of this service.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use totem_config::{CallSettings, SilenceSettings};
use totem_core::{
    CallEvent, CallStatus, Error, LinkEvent, LinkHandle, ReplyGenerator, Result,
    SpeechSynthesizer, TranscriberLink, TranscriptFragment,
};

use crate::silence::{LevelEvent, SilenceDetector};

/// A finalized utterance that arrived while a turn was in flight
#[derive(Debug, Clone)]
pub struct PendingUtterance {
    pub text: String,
    pub confidence: f32,
    pub queued_at: Instant,
}

/// Phase of the current turn.
///
/// A tagged state instead of independent `processing`/`synthesisPlaying`
/// booleans: the impossible combination (generating while speaking) cannot
/// be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPhase {
    /// No turn in flight; final transcripts are processed immediately
    #[default]
    Listening,
    /// Reply generation in flight
    Generating,
    /// Speech synthesis/playback in flight; capture is muted
    Speaking,
}

impl TurnPhase {
    /// Whether a turn cycle currently occupies the call
    pub fn is_busy(&self) -> bool {
        !matches!(self, TurnPhase::Listening)
    }
}

/// Commands accepted from the transport adapter
#[derive(Debug)]
pub enum CallCommand {
    StartCall,
    StopCall,
    AudioFrame(Vec<u8>),
    Reset,
    Status(oneshot::Sender<CallStatus>),
    /// Stop the call and terminate the actor; sent when the transport
    /// connection goes away
    Shutdown,
}

/// Everything that can wake the actor
enum Input {
    Command(CallCommand),
    Link(LinkEvent),
    GenerationDone {
        turn: u64,
        utterance: String,
        result: Result<String>,
    },
    SynthesisDone {
        turn: u64,
        result: Result<Vec<u8>>,
    },
    KeepAliveTick,
    ReconnectDue {
        attempt: u64,
    },
}

/// Collaborators injected into each orchestrator
pub struct OrchestratorDeps {
    pub transcriber: Arc<dyn TranscriberLink>,
    pub generator: Arc<dyn ReplyGenerator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
}

/// Cheap cloneable handle used by the transport adapter
#[derive(Clone)]
pub struct CallHandle {
    tx: mpsc::UnboundedSender<Input>,
}

impl CallHandle {
    pub fn start_call(&self) {
        let _ = self.tx.send(Input::Command(CallCommand::StartCall));
    }

    pub fn stop_call(&self) {
        let _ = self.tx.send(Input::Command(CallCommand::StopCall));
    }

    pub fn audio_frame(&self, frame: Vec<u8>) {
        let _ = self.tx.send(Input::Command(CallCommand::AudioFrame(frame)));
    }

    pub fn reset(&self) {
        let _ = self.tx.send(Input::Command(CallCommand::Reset));
    }

    /// Stop the call and release the actor. The handle is useless
    /// afterwards.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Input::Command(CallCommand::Shutdown));
    }

    /// Snapshot of call state; `None` if the actor is gone
    pub async fn status(&self) -> Option<CallStatus> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Input::Command(CallCommand::Status(reply_tx)))
            .ok()?;
        reply_rx.await.ok()
    }
}

/// The per-call actor
pub struct CallOrchestrator {
    deps: OrchestratorDeps,
    call_cfg: CallSettings,
    keep_alive_interval: Duration,
    events: mpsc::UnboundedSender<CallEvent>,
    input_tx: mpsc::UnboundedSender<Input>,

    silence: SilenceDetector,
    active: bool,
    phase: TurnPhase,
    user_speaking: bool,
    link: Option<Box<dyn LinkHandle>>,
    link_task: Option<JoinHandle<()>>,
    keep_alive_task: Option<JoinHandle<()>>,
    partial: String,
    queue: VecDeque<PendingUtterance>,
    turn_seq: u64,
    reconnect_seq: u64,
    reconnect_pending: bool,
}

impl CallOrchestrator {
    /// Spawn the actor; events flow out on `events`, control flows in via
    /// the returned handle.
    pub fn spawn(
        deps: OrchestratorDeps,
        call_cfg: CallSettings,
        silence_cfg: SilenceSettings,
        keep_alive_interval: Duration,
        events: mpsc::UnboundedSender<CallEvent>,
    ) -> CallHandle {
        let (input_tx, input_rx) = mpsc::unbounded_channel();

        let orchestrator = Self {
            deps,
            call_cfg,
            keep_alive_interval,
            events,
            input_tx: input_tx.clone(),
            silence: SilenceDetector::new(silence_cfg),
            active: false,
            phase: TurnPhase::Listening,
            user_speaking: false,
            link: None,
            link_task: None,
            keep_alive_task: None,
            partial: String::new(),
            queue: VecDeque::new(),
            turn_seq: 0,
            reconnect_seq: 0,
            reconnect_pending: false,
        };

        tokio::spawn(orchestrator.run(input_rx));

        CallHandle { tx: input_tx }
    }

    async fn run(mut self, mut input_rx: mpsc::UnboundedReceiver<Input>) {
        while let Some(input) = input_rx.recv().await {
            match input {
                Input::Command(CallCommand::StartCall) => self.handle_start_call().await,
                Input::Command(CallCommand::StopCall) => self.handle_stop_call(),
                Input::Command(CallCommand::AudioFrame(frame)) => self.handle_audio_frame(&frame),
                Input::Command(CallCommand::Reset) => self.handle_reset(),
                Input::Command(CallCommand::Status(reply_tx)) => {
                    let _ = reply_tx.send(self.snapshot());
                }
                Input::Command(CallCommand::Shutdown) => {
                    self.handle_stop_call();
                    break;
                }
                Input::Link(event) => self.handle_link_event(event),
                Input::GenerationDone {
                    turn,
                    utterance,
                    result,
                } => self.handle_generation_done(turn, utterance, result),
                Input::SynthesisDone { turn, result } => self.handle_synthesis_done(turn, result),
                Input::KeepAliveTick => self.handle_keep_alive_tick(),
                Input::ReconnectDue { attempt } => self.handle_reconnect_due(attempt).await,
            }
        }

        // Transport adapter dropped the handle: release everything.
        self.teardown();
    }

    async fn handle_start_call(&mut self) {
        info!("starting continuous call");

        self.active = true;
        self.phase = TurnPhase::Listening;
        self.user_speaking = false;
        self.turn_seq = self.turn_seq.wrapping_add(1);
        self.partial.clear();
        self.queue.clear();
        self.silence.reset();

        // a stale link from a previous call must not outlive the restart
        self.close_link();
        self.open_link().await;
        self.start_keep_alive();

        self.emit(CallEvent::CallStarted);
    }

    fn handle_stop_call(&mut self) {
        if self.active {
            info!("stopping continuous call");
        }

        self.active = false;
        self.phase = TurnPhase::Listening;
        self.user_speaking = false;
        // Invalidate in-flight turn steps and scheduled reconnects; their
        // results are discarded when they land.
        self.turn_seq = self.turn_seq.wrapping_add(1);
        self.reconnect_seq = self.reconnect_seq.wrapping_add(1);
        self.reconnect_pending = false;

        self.stop_keep_alive();
        self.close_link();
        self.partial.clear();
        self.queue.clear();

        self.emit(CallEvent::CallStopped);
    }

    fn handle_reset(&mut self) {
        self.handle_stop_call();
        self.deps.generator.reset();
        self.emit(CallEvent::ConversationReset);
    }

    fn handle_audio_frame(&mut self, frame: &[u8]) {
        if !self.active {
            return;
        }

        let analysis = self.silence.process_frame(frame, Instant::now());
        self.emit(CallEvent::AudioLevel(analysis.level));

        match analysis.event {
            Some(LevelEvent::SilenceConfirmed { duration_ms }) => {
                debug!(duration_ms, level = analysis.level, "silence confirmed");
            }
            Some(LevelEvent::Resumed { level }) => {
                debug!(level, "audio resumed");
                self.user_speaking = true;
            }
            None => {}
        }

        // Half-duplex guard: never transcribe our own synthesized speech.
        let speaking = self.phase == TurnPhase::Speaking;
        match self.link.as_ref() {
            Some(link) if link.is_open() && !speaking => link.send_frame(frame),
            Some(_) if speaking => trace!("synthesis playing, frame not forwarded"),
            _ => trace!("transcriber not connected, frame dropped"),
        }
    }

    fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Transcript(fragment) => self.handle_transcript(fragment),
            LinkEvent::Closed { reason } => {
                warn!(%reason, "transcriber link closed");
                self.drop_link();
                if self.active {
                    self.emit(CallEvent::Error(format!(
                        "transcriber disconnected: {reason}"
                    )));
                    self.schedule_reconnect();
                }
            }
        }
    }

    fn handle_transcript(&mut self, fragment: TranscriptFragment) {
        if !self.active {
            debug!("call inactive, ignoring transcript");
            return;
        }

        if fragment.is_final {
            self.partial.clear();
        }

        if fragment.is_empty() {
            return;
        }

        self.emit(CallEvent::Transcription(fragment.clone()));

        if !fragment.is_final {
            let text = fragment.text.trim();
            if self.partial.is_empty() {
                self.partial.push_str(text);
            } else {
                self.partial.push(' ');
                self.partial.push_str(text);
            }
            debug!(partial = %self.partial, "partial transcript accumulated");
            return;
        }

        let text = fragment.text.trim().to_string();
        debug!(%text, confidence = fragment.confidence, "final transcript");

        if self.phase.is_busy() {
            self.queue.push_back(PendingUtterance {
                text,
                confidence: fragment.confidence,
                queued_at: Instant::now(),
            });
            debug!(queue_len = self.queue.len(), "turn in flight, utterance queued");
        } else {
            self.begin_turn(text, fragment.confidence);
        }
    }

    /// Start one turn cycle: reply generation now, synthesis when the
    /// reply lands.
    fn begin_turn(&mut self, utterance: String, confidence: f32) {
        if !self.active || self.phase.is_busy() {
            return;
        }

        self.turn_seq = self.turn_seq.wrapping_add(1);
        let turn = self.turn_seq;
        self.phase = TurnPhase::Generating;
        self.emit(CallEvent::ProcessingStarted);
        info!(text = %utterance, confidence, "processing utterance");

        let generator = Arc::clone(&self.deps.generator);
        let timeout_secs = self.call_cfg.response_timeout_secs;
        let tx = self.input_tx.clone();
        tokio::spawn(async move {
            let result = match tokio::time::timeout(
                Duration::from_secs(timeout_secs),
                generator.reply(&utterance),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(Error::timeout("response generation", timeout_secs)),
            };
            let _ = tx.send(Input::GenerationDone {
                turn,
                utterance,
                result,
            });
        });
    }

    fn handle_generation_done(&mut self, turn: u64, utterance: String, result: Result<String>) {
        if turn != self.turn_seq || !self.active || self.phase != TurnPhase::Generating {
            debug!("stale generation result discarded");
            return;
        }

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "reply generation failed");
                self.emit(CallEvent::Error(e.to_string()));
                self.finish_turn();
                return;
            }
        };

        info!(chars = reply.len(), "reply generated");
        self.emit(CallEvent::AiResponse {
            text: reply.clone(),
            user_message: utterance,
        });

        if reply.trim().is_empty() {
            debug!("empty reply, skipping synthesis");
            self.finish_turn();
            return;
        }

        // The phase must flip before the synthesis request goes out so a
        // frame racing in right now already sees the mute.
        self.phase = TurnPhase::Speaking;

        let synthesizer = Arc::clone(&self.deps.synthesizer);
        let tx = self.input_tx.clone();
        tokio::spawn(async move {
            let result = synthesizer.synthesize(&reply).await;
            let _ = tx.send(Input::SynthesisDone { turn, result });
        });
    }

    fn handle_synthesis_done(&mut self, turn: u64, result: Result<Vec<u8>>) {
        if turn != self.turn_seq || !self.active || self.phase != TurnPhase::Speaking {
            debug!("stale synthesis result discarded");
            return;
        }

        match result {
            Ok(audio) => {
                info!(bytes = audio.len(), "reply audio synthesized");
                self.emit(CallEvent::TtsAudio(audio));
                self.finish_turn();

                // One queued utterance per completed turn, oldest first.
                if let Some(next) = self.queue.pop_front() {
                    debug!(
                        remaining = self.queue.len(),
                        waited_ms = next.queued_at.elapsed().as_millis() as u64,
                        "draining queued utterance"
                    );
                    self.begin_turn(next.text, next.confidence);
                }
            }
            Err(e) => {
                error!(error = %e, "speech synthesis failed");
                self.emit(CallEvent::Error(e.to_string()));
                // No drain on failure: the next final transcript resumes
                // the flow instead.
                self.finish_turn();
            }
        }
    }

    /// End-of-turn discipline shared by every exit path
    fn finish_turn(&mut self) {
        self.phase = TurnPhase::Listening;
        self.emit(CallEvent::ProcessingFinished);
    }

    fn handle_keep_alive_tick(&mut self) {
        if !self.active {
            return;
        }
        if let Some(link) = self.link.as_ref() {
            if link.is_open() {
                link.send_frame(&[]);
                trace!("keep-alive sent");
            }
        }
    }

    async fn open_link(&mut self) {
        match self.deps.transcriber.open().await {
            Ok((handle, mut events)) => {
                info!(
                    provider = self.deps.transcriber.provider_name(),
                    "transcriber link open"
                );
                self.link = Some(handle);
                let tx = self.input_tx.clone();
                self.link_task = Some(tokio::spawn(async move {
                    while let Some(event) = events.next().await {
                        if tx.send(Input::Link(event)).is_err() {
                            break;
                        }
                    }
                }));
            }
            Err(e) => {
                // Degraded mode: the call continues, frames are dropped.
                warn!(error = %e, "transcriber open failed, continuing without transcription");
                self.emit(CallEvent::Error(e.to_string()));
                self.link = None;
            }
        }
    }

    fn schedule_reconnect(&mut self) {
        if !self.active || self.reconnect_pending {
            return;
        }
        self.reconnect_pending = true;
        let attempt = self.reconnect_seq;
        let delay = Duration::from_secs(self.call_cfg.reconnect_delay_secs);
        let tx = self.input_tx.clone();
        info!(delay_secs = self.call_cfg.reconnect_delay_secs, "scheduling transcriber retry");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Input::ReconnectDue { attempt });
        });
    }

    async fn handle_reconnect_due(&mut self, attempt: u64) {
        if attempt != self.reconnect_seq || !self.active {
            return;
        }
        self.reconnect_pending = false;
        if self.link.is_some() {
            return;
        }
        info!("retrying transcriber connection");
        self.open_link().await;
    }

    fn snapshot(&self) -> CallStatus {
        CallStatus {
            is_call_active: self.active,
            is_processing: self.phase.is_busy(),
            is_synthesis_playing: self.phase == TurnPhase::Speaking,
            is_user_speaking: self.user_speaking,
            is_connected: self.link.as_ref().map(|l| l.is_open()).unwrap_or(false),
            pending_queue_length: self.queue.len(),
            current_transcription: self.partial.clone(),
            conversation_history_length: self.deps.generator.history_len(),
        }
    }

    fn start_keep_alive(&mut self) {
        self.stop_keep_alive();
        let interval = self.keep_alive_interval;
        let tx = self.input_tx.clone();
        self.keep_alive_task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // the interval's first tick is immediate, skip it
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if tx.send(Input::KeepAliveTick).is_err() {
                    break;
                }
            }
        }));
    }

    fn stop_keep_alive(&mut self) {
        if let Some(task) = self.keep_alive_task.take() {
            task.abort();
        }
    }

    fn close_link(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close();
        }
        if let Some(task) = self.link_task.take() {
            task.abort();
        }
    }

    fn drop_link(&mut self) {
        self.link = None;
        if let Some(task) = self.link_task.take() {
            task.abort();
        }
    }

    fn teardown(&mut self) {
        self.active = false;
        self.stop_keep_alive();
        self.close_link();
        self.queue.clear();
        self.partial.clear();
        debug!("call orchestrator released");
    }

    fn emit(&self, event: CallEvent) {
        if self.events.send(event).is_err() {
            trace!("event receiver gone");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use totem_core::LinkEventStream;

    // ---- mock collaborators --------------------------------------------

    /// Transcriber whose event stream is fed by the test
    struct MockTranscriber {
        sender: Arc<Mutex<Option<mpsc::UnboundedSender<LinkEvent>>>>,
        frames: Arc<Mutex<Vec<Vec<u8>>>>,
        fail_open: bool,
    }

    impl MockTranscriber {
        fn new() -> Self {
            Self {
                sender: Arc::new(Mutex::new(None)),
                frames: Arc::new(Mutex::new(Vec::new())),
                fail_open: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail_open: true,
                ..Self::new()
            }
        }

        fn inject(&self, event: LinkEvent) {
            let guard = self.sender.lock();
            guard
                .as_ref()
                .expect("link not open")
                .send(event)
                .expect("link stream closed");
        }

        fn inject_final(&self, text: &str, confidence: f32) {
            self.inject(LinkEvent::Transcript(TranscriptFragment::final_text(
                text, confidence,
            )));
        }

        fn inject_partial(&self, text: &str) {
            self.inject(LinkEvent::Transcript(TranscriptFragment::partial(text, 0.5)));
        }

        fn frames_forwarded(&self) -> usize {
            // keep-alive empty frames do not count as forwarded audio
            self.frames.lock().iter().filter(|f| !f.is_empty()).count()
        }
    }

    struct MockLinkHandle {
        frames: Arc<Mutex<Vec<Vec<u8>>>>,
        open: bool,
    }

    impl LinkHandle for MockLinkHandle {
        fn send_frame(&self, frame: &[u8]) {
            if self.open {
                self.frames.lock().push(frame.to_vec());
            }
        }

        fn close(&mut self) {
            self.open = false;
        }

        fn is_open(&self) -> bool {
            self.open
        }
    }

    #[async_trait]
    impl TranscriberLink for MockTranscriber {
        async fn open(&self) -> Result<(Box<dyn LinkHandle>, LinkEventStream)> {
            if self.fail_open {
                return Err(Error::Transcriber("connect refused".into()));
            }
            let (tx, rx) = mpsc::unbounded_channel();
            *self.sender.lock() = Some(tx);
            let handle = MockLinkHandle {
                frames: Arc::clone(&self.frames),
                open: true,
            };
            let stream = Box::pin(tokio_stream::wrappers::UnboundedReceiverStream::new(rx));
            Ok((Box::new(handle), stream))
        }

        fn provider_name(&self) -> &str {
            "mock"
        }
    }

    /// Generator with a configurable delay and scripted failures
    struct MockGenerator {
        delay: Duration,
        fail: bool,
        empty_reply: bool,
        calls: Arc<Mutex<Vec<String>>>,
        history: Arc<Mutex<usize>>,
    }

    impl MockGenerator {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                fail: false,
                empty_reply: false,
                calls: Arc::new(Mutex::new(Vec::new())),
                history: Arc::new(Mutex::new(0)),
            }
        }
    }

    #[async_trait]
    impl ReplyGenerator for MockGenerator {
        async fn reply(&self, utterance: &str) -> Result<String> {
            self.calls.lock().push(utterance.to_string());
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(Error::Generation("model unavailable".into()));
            }
            *self.history.lock() += 2;
            if self.empty_reply {
                Ok(String::new())
            } else {
                Ok(format!("respuesta: {utterance}"))
            }
        }

        fn history_len(&self) -> usize {
            *self.history.lock()
        }

        fn reset(&self) {
            *self.history.lock() = 0;
        }
    }

    struct MockSynthesizer {
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl SpeechSynthesizer for MockSynthesizer {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(Error::Synthesis("voice service down".into()));
            }
            Ok(text.as_bytes().to_vec())
        }

        fn voice_id(&self) -> &str {
            "mock-voice"
        }
    }

    // ---- harness -------------------------------------------------------

    struct Harness {
        handle: CallHandle,
        events: mpsc::UnboundedReceiver<CallEvent>,
        transcriber: Arc<MockTranscriber>,
        generator: Arc<MockGenerator>,
    }

    fn spawn_harness(
        transcriber: MockTranscriber,
        generator: MockGenerator,
        synthesizer: MockSynthesizer,
    ) -> Harness {
        let transcriber = Arc::new(transcriber);
        let generator = Arc::new(generator);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let handle = CallOrchestrator::spawn(
            OrchestratorDeps {
                transcriber: transcriber.clone(),
                generator: generator.clone(),
                synthesizer: Arc::new(synthesizer),
            },
            CallSettings::default(),
            SilenceSettings::default(),
            Duration::from_secs(30),
            event_tx,
        );
        Harness {
            handle,
            events: event_rx,
            transcriber,
            generator,
        }
    }

    fn default_harness() -> Harness {
        spawn_harness(
            MockTranscriber::new(),
            MockGenerator::new(Duration::from_millis(50)),
            MockSynthesizer {
                delay: Duration::from_millis(50),
                fail: false,
            },
        )
    }

    impl Harness {
        /// Next event that is not an audio-level update
        async fn next_event(&mut self) -> CallEvent {
            loop {
                match self.events.recv().await.expect("event channel closed") {
                    CallEvent::AudioLevel(_) => continue,
                    other => return other,
                }
            }
        }

        async fn expect_started(&mut self) {
            assert!(matches!(self.next_event().await, CallEvent::CallStarted));
        }

        async fn start(&mut self) {
            self.handle.start_call();
            self.expect_started().await;
        }

        async fn status(&mut self) -> CallStatus {
            self.handle.status().await.expect("actor gone")
        }
    }

    fn frame() -> Vec<u8> {
        vec![0u8; totem_core::FRAME_BYTES]
    }

    // ---- tests ---------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_idle_final_processes_immediately() {
        let mut h = default_harness();
        h.start().await;

        h.transcriber.inject_final("¿Qué es Mounjaro?", 0.97);

        assert!(matches!(h.next_event().await, CallEvent::Transcription(f) if f.is_final));
        assert!(matches!(h.next_event().await, CallEvent::ProcessingStarted));
        match h.next_event().await {
            CallEvent::AiResponse { text, user_message } => {
                assert_eq!(user_message, "¿Qué es Mounjaro?");
                assert!(text.starts_with("respuesta:"));
            }
            other => panic!("expected AiResponse, got {other:?}"),
        }
        assert!(matches!(h.next_event().await, CallEvent::TtsAudio(_)));
        assert!(matches!(h.next_event().await, CallEvent::ProcessingFinished));

        assert_eq!(h.generator.calls.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_while_speaking_is_queued() {
        let mut h = spawn_harness(
            MockTranscriber::new(),
            MockGenerator::new(Duration::from_millis(10)),
            MockSynthesizer {
                delay: Duration::from_secs(60),
                fail: false,
            },
        );
        h.start().await;

        h.transcriber.inject_final("primera", 0.9);
        // drain events up to the reply; synthesis now hangs for 60s
        loop {
            if matches!(h.next_event().await, CallEvent::AiResponse { .. }) {
                break;
            }
        }

        h.transcriber.inject_final("hola", 0.9);
        assert!(matches!(h.next_event().await, CallEvent::Transcription(_)));

        let status = h.status().await;
        assert!(status.is_synthesis_playing);
        assert_eq!(status.pending_queue_length, 1);
        assert_eq!(h.generator.calls.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_drains_in_fifo_order() {
        let mut h = default_harness();
        h.start().await;

        h.transcriber.inject_final("uno", 0.9);
        // wait until the first turn reaches synthesis
        loop {
            if matches!(h.next_event().await, CallEvent::AiResponse { .. }) {
                break;
            }
        }
        h.transcriber.inject_final("dos", 0.9);
        h.transcriber.inject_final("tres", 0.9);

        // three full turns complete, one after the other
        let mut finishes = 0;
        while finishes < 3 {
            if matches!(h.next_event().await, CallEvent::ProcessingFinished) {
                finishes += 1;
            }
        }

        assert_eq!(*h.generator.calls.lock(), vec!["uno", "dos", "tres"]);
        assert_eq!(h.status().await.pending_queue_length, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_duplex_guard_blocks_frames_while_speaking() {
        let mut h = spawn_harness(
            MockTranscriber::new(),
            MockGenerator::new(Duration::from_millis(10)),
            MockSynthesizer {
                delay: Duration::from_secs(60),
                fail: false,
            },
        );
        h.start().await;

        h.handle.audio_frame(frame());
        h.handle.audio_frame(frame());
        // listening: both forwarded
        let status = h.status().await;
        assert!(status.is_call_active);
        assert_eq!(h.transcriber.frames_forwarded(), 2);

        h.transcriber.inject_final("pregunta", 0.9);
        loop {
            if matches!(h.next_event().await, CallEvent::AiResponse { .. }) {
                break;
            }
        }

        // speaking: frames still metered but never forwarded
        h.handle.audio_frame(frame());
        h.handle.audio_frame(frame());
        let status = h.status().await;
        assert!(status.is_synthesis_playing);
        assert_eq!(h.transcriber.frames_forwarded(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let mut h = default_harness();
        h.start().await;

        h.handle.stop_call();
        assert!(matches!(h.next_event().await, CallEvent::CallStopped));
        h.handle.stop_call();
        assert!(matches!(h.next_event().await, CallEvent::CallStopped));

        let status = h.status().await;
        assert!(!status.is_call_active);
        assert!(!status.is_processing);
        assert!(!status.is_synthesis_playing);
        assert_eq!(status.pending_queue_length, 0);
        assert_eq!(status.current_transcription, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_accumulation_resets_on_final() {
        let mut h = default_harness();
        h.start().await;

        h.transcriber.inject_partial("a");
        h.transcriber.inject_partial("a b");
        h.transcriber.inject_partial("a b c");

        // partials accumulate space-joined
        for _ in 0..3 {
            assert!(matches!(h.next_event().await, CallEvent::Transcription(f) if !f.is_final));
        }
        assert_eq!(h.status().await.current_transcription, "a a b a b c");

        h.transcriber.inject_final("a b c", 0.95);
        loop {
            if matches!(h.next_event().await, CallEvent::ProcessingFinished) {
                break;
            }
        }
        assert_eq!(h.status().await.current_transcription, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_final_is_discarded() {
        let mut h = default_harness();
        h.start().await;

        h.transcriber.inject_final("   ", 0.3);
        h.transcriber.inject_final("real", 0.9);

        // the blank final produced no events at all; the next event chain
        // belongs to "real"
        assert!(matches!(h.next_event().await, CallEvent::Transcription(f) if f.text == "real"));
        assert!(matches!(h.next_event().await, CallEvent::ProcessingStarted));
        assert_eq!(h.generator.calls.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_failure_degrades_without_panic() {
        let mut h = spawn_harness(
            MockTranscriber::failing(),
            MockGenerator::new(Duration::from_millis(10)),
            MockSynthesizer {
                delay: Duration::from_millis(10),
                fail: false,
            },
        );

        h.handle.start_call();
        assert!(matches!(h.next_event().await, CallEvent::Error(_)));
        h.expect_started().await;

        // audio frames are metered and dropped, nothing panics
        h.handle.audio_frame(frame());
        let status = h.status().await;
        assert!(status.is_call_active);
        assert!(!status.is_connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_timeout_surfaces_error() {
        let mut h = spawn_harness(
            MockTranscriber::new(),
            MockGenerator::new(Duration::from_secs(120)),
            MockSynthesizer {
                delay: Duration::from_millis(10),
                fail: false,
            },
        );
        h.start().await;

        h.transcriber.inject_final("lenta", 0.9);
        assert!(matches!(h.next_event().await, CallEvent::Transcription(_)));
        assert!(matches!(h.next_event().await, CallEvent::ProcessingStarted));
        match h.next_event().await {
            CallEvent::Error(message) => assert!(message.contains("timed out")),
            other => panic!("expected Error, got {other:?}"),
        }
        assert!(matches!(h.next_event().await, CallEvent::ProcessingFinished));
        assert!(!h.status().await.is_processing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_synthesis_failure_does_not_drain_queue() {
        let mut h = spawn_harness(
            MockTranscriber::new(),
            MockGenerator::new(Duration::from_millis(10)),
            MockSynthesizer {
                delay: Duration::from_millis(200),
                fail: true,
            },
        );
        h.start().await;

        h.transcriber.inject_final("uno", 0.9);
        loop {
            if matches!(h.next_event().await, CallEvent::AiResponse { .. }) {
                break;
            }
        }
        h.transcriber.inject_final("dos", 0.9);
        assert!(matches!(h.next_event().await, CallEvent::Transcription(_)));

        match h.next_event().await {
            CallEvent::Error(message) => assert!(message.contains("voice service down")),
            other => panic!("expected Error, got {other:?}"),
        }
        assert!(matches!(h.next_event().await, CallEvent::ProcessingFinished));

        // "dos" stays queued; only the next successful turn would drain it
        let status = h.status().await;
        assert_eq!(status.pending_queue_length, 1);
        assert_eq!(h.generator.calls.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_start_round_trip_resets_state() {
        let mut h = spawn_harness(
            MockTranscriber::new(),
            MockGenerator::new(Duration::from_millis(10)),
            MockSynthesizer {
                delay: Duration::from_secs(60),
                fail: false,
            },
        );
        h.start().await;

        h.transcriber.inject_partial("sin terminar");
        h.transcriber.inject_final("uno", 0.9);
        loop {
            if matches!(h.next_event().await, CallEvent::AiResponse { .. }) {
                break;
            }
        }
        h.transcriber.inject_final("dos", 0.9);
        assert!(matches!(h.next_event().await, CallEvent::Transcription(_)));
        assert_eq!(h.status().await.pending_queue_length, 1);

        h.handle.stop_call();
        assert!(matches!(h.next_event().await, CallEvent::CallStopped));
        h.start().await;

        let status = h.status().await;
        assert!(status.is_call_active);
        assert_eq!(status.pending_queue_length, 0);
        assert_eq!(status.current_transcription, "");
        assert!(!status.is_processing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_history_and_emits_events() {
        let mut h = default_harness();
        h.start().await;

        h.transcriber.inject_final("hola", 0.9);
        loop {
            if matches!(h.next_event().await, CallEvent::ProcessingFinished) {
                break;
            }
        }
        assert_eq!(h.status().await.conversation_history_length, 2);

        h.handle.reset();
        assert!(matches!(h.next_event().await, CallEvent::CallStopped));
        assert!(matches!(h.next_event().await, CallEvent::ConversationReset));
        assert_eq!(h.status().await.conversation_history_length, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_close_schedules_single_retry() {
        let mut h = default_harness();
        h.start().await;

        h.transcriber.inject(LinkEvent::Closed {
            reason: "provider hiccup".into(),
        });
        match h.next_event().await {
            CallEvent::Error(message) => assert!(message.contains("disconnected")),
            other => panic!("expected Error, got {other:?}"),
        }
        assert!(!h.status().await.is_connected);

        // after the 5s backoff the link reopens (paused clock auto-advances)
        tokio::time::sleep(Duration::from_secs(6)).await;
        let status = h.status().await;
        assert!(status.is_connected);

        // and transcripts flow through the fresh link
        h.transcriber.inject_final("de vuelta", 0.9);
        assert!(matches!(h.next_event().await, CallEvent::Transcription(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_reply_skips_synthesis() {
        let mut generator = MockGenerator::new(Duration::from_millis(10));
        generator.empty_reply = true;
        let mut h = spawn_harness(
            MockTranscriber::new(),
            generator,
            MockSynthesizer {
                delay: Duration::from_millis(10),
                fail: false,
            },
        );
        h.start().await;

        h.transcriber.inject_final("pregunta", 0.9);
        assert!(matches!(h.next_event().await, CallEvent::Transcription(_)));
        assert!(matches!(h.next_event().await, CallEvent::ProcessingStarted));
        assert!(matches!(h.next_event().await, CallEvent::AiResponse { .. }));
        // no TtsAudio: the turn ends straight after the empty reply
        assert!(matches!(h.next_event().await, CallEvent::ProcessingFinished));
        assert!(!h.status().await.is_synthesis_playing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_ignored_when_inactive() {
        let mut h = default_harness();

        // no call started: frames are ignored outright
        h.handle.audio_frame(frame());
        let status = h.status().await;
        assert!(!status.is_call_active);
        assert_eq!(h.transcriber.frames_forwarded(), 0);
    }
}
