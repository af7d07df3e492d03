//! Single-threaded driver around [`PlaybackController`].
//!
//! The reader owns the backend and an event channel. Backend completions,
//! catalog changes and commands posted from other threads all arrive on that
//! channel and are handled one at a time, so the controller never sees two
//! events concurrently. Pacing timers are deadlines checked by the same loop.

use crate::backend::{Completion, SpeechBackend, SpeechEvent};
use crate::classify::{Classifier, HeuristicClassifier};
use crate::config::AppConfig;
use crate::document::{PipelineSettings, build_document};
use crate::error::{ReaderError, Result};
use crate::keep_alive::{KeepAlivePolicy, NoKeepAlive};
use crate::playback::{
    Effect, PlaybackController, PlaybackState, ProgressView, ReaderCommand,
};
use crate::source::TextSource;
use crate::voices::VoiceAssigner;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Everything that can wake the reader loop.
#[derive(Debug)]
pub enum ReaderEvent {
    Speech(SpeechEvent),
    /// The backend's voice list changed; re-run default selection.
    VoicesChanged,
    Command(ReaderCommand),
}

#[derive(Debug, Clone, Copy)]
struct PendingTimer {
    deadline: Instant,
    timer: u64,
}

pub struct Reader<B: SpeechBackend> {
    controller: PlaybackController,
    backend: B,
    keep_alive: Box<dyn KeepAlivePolicy>,
    classifier: Box<dyn Classifier>,
    pipeline: PipelineSettings,
    events_tx: Sender<ReaderEvent>,
    events_rx: Receiver<ReaderEvent>,
    pending_timer: Option<PendingTimer>,
    progress: ProgressView,
    on_progress: Option<Box<dyn FnMut(&ProgressView)>>,
}

impl<B: SpeechBackend> Reader<B> {
    pub fn new(backend: B, config: &AppConfig) -> Self {
        let voices = VoiceAssigner::new(config.voice_preferences(), config.smart_voices);
        let controller = PlaybackController::new(config.playback_settings(), voices);
        let progress = controller.progress();
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            controller,
            backend,
            keep_alive: Box::new(NoKeepAlive),
            classifier: Box::new(HeuristicClassifier),
            pipeline: config.pipeline_settings(),
            events_tx,
            events_rx,
            pending_timer: None,
            progress,
            on_progress: None,
        }
    }

    pub fn with_keep_alive(mut self, policy: impl KeepAlivePolicy + 'static) -> Self {
        self.keep_alive = Box::new(policy);
        self
    }

    pub fn with_classifier(mut self, classifier: impl Classifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    /// Called with every published progress update.
    pub fn on_progress(mut self, callback: impl FnMut(&ProgressView) + 'static) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// Handle for posting events from other threads.
    pub fn events(&self) -> Sender<ReaderEvent> {
        self.events_tx.clone()
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn progress(&self) -> &ProgressView {
        &self.progress
    }

    pub fn state(&self) -> PlaybackState {
        self.controller.state()
    }

    /// Poll the backend until it reports ready, then load its voices.
    pub fn wait_for_backend(&mut self, timeout: Duration, poll_interval: Duration) -> Result<()> {
        let started = Instant::now();
        loop {
            if self.backend.is_ready() {
                debug!(waited_ms = started.elapsed().as_millis(), "Speech backend ready");
                self.refresh_voices();
                return Ok(());
            }
            let waited = started.elapsed();
            if waited >= timeout {
                warn!(waited_ms = waited.as_millis(), "Speech backend never became ready");
                return Err(ReaderError::BackendUnavailable { waited });
            }
            thread::sleep(poll_interval.min(timeout - waited));
        }
    }

    pub fn refresh_voices(&mut self) {
        let voices = self.backend.voices();
        self.controller.on_voices_changed(voices);
    }

    /// Build a document from `source` and install it. On failure the current
    /// document and position are left alone.
    pub fn load(&mut self, source: &mut dyn TextSource) -> Result<()> {
        let document = build_document(source, &self.pipeline, self.classifier.as_ref())?;
        let effects = self.controller.load_document(document);
        self.run_effects(effects);
        Ok(())
    }

    pub fn command(&mut self, command: ReaderCommand) -> Result<()> {
        let effects = self.controller.apply_command(command)?;
        self.run_effects(effects);
        Ok(())
    }

    /// Handle at most one event or due timer, waiting up to `max_wait`.
    /// Returns whether anything was handled.
    pub fn step(&mut self, max_wait: Duration) -> bool {
        if self.fire_due_timer() {
            return true;
        }
        let wait = match self.pending_timer {
            Some(pending) => pending
                .deadline
                .saturating_duration_since(Instant::now())
                .min(max_wait),
            None => max_wait,
        };
        match self.events_rx.recv_timeout(wait) {
            Ok(event) => {
                self.handle_event(event);
                true
            }
            Err(RecvTimeoutError::Timeout) => self.fire_due_timer(),
            Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Handle everything that is already due without blocking.
    pub fn process_pending(&mut self) {
        while self.step(Duration::ZERO) {}
    }

    /// Drive playback until it stops on its own or is paused.
    pub fn run_until_stopped(&mut self) {
        while self.controller.state() == PlaybackState::Playing {
            self.step(Duration::from_millis(250));
        }
        info!(
            position = self.progress.position,
            total = self.progress.total,
            "Playback stopped"
        );
    }

    fn handle_event(&mut self, event: ReaderEvent) {
        match event {
            ReaderEvent::Speech(event) => {
                let effects = self.controller.on_speech_event(event);
                self.run_effects(effects);
            }
            ReaderEvent::VoicesChanged => self.refresh_voices(),
            ReaderEvent::Command(command) => {
                let action = command.action();
                if let Err(err) = self.command(command) {
                    warn!(action, "Reader command rejected: {err}");
                }
            }
        }
    }

    fn fire_due_timer(&mut self) -> bool {
        match self.pending_timer {
            Some(pending) if pending.deadline <= Instant::now() => {
                self.pending_timer = None;
                let effects = self.controller.on_timer(pending.timer);
                self.run_effects(effects);
                true
            }
            _ => false,
        }
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::CancelSpeech => self.backend.cancel_current(),
                Effect::Speak(request) => {
                    let completion = Completion::new(request.seq, self.events_tx.clone());
                    self.backend.speak(request, completion);
                }
                Effect::ScheduleResume { delay, timer } => {
                    self.pending_timer = Some(PendingTimer {
                        deadline: Instant::now() + delay,
                        timer,
                    });
                }
                Effect::KeepAliveStart => self.keep_alive.playing_started(),
                Effect::KeepAliveStop => self.keep_alive.playing_stopped(),
                Effect::Progress(view) => {
                    debug!(
                        state = ?view.state,
                        position = view.position,
                        total = view.total,
                        percent = view.percent,
                        "Progress"
                    );
                    if let Some(callback) = self.on_progress.as_mut() {
                        callback(&view);
                    }
                    self.progress = view;
                }
            }
        }
    }
}
