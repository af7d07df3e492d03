//! Playback state machine.
//!
//! The controller never talks to the synthesis backend directly. Every
//! operation mutates controller state and returns the [`Effect`]s the driver
//! must carry out: cancel or submit speech, arm a pacing timer, toggle the
//! keep-alive policy, publish progress.
//!
//! Each speech request carries a sequence number. Only the newest one is
//! honored; a completion for anything older (superseded by pause, seek or a
//! new document) is dropped without touching the position.

use crate::backend::{SpeechEvent, SpeechRequest, SynthesisOutcome};
use crate::document::{Chunk, Document};
use crate::error::{ReaderError, Result};
use crate::voices::{Voice, VoiceAssigner, VoiceAssignment};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const MIN_RATE: f32 = 0.1;
pub const MAX_RATE: f32 = 10.0;

/// Keep a configured rate inside the supported range; anything unusable
/// becomes 1.0.
pub fn clamp_rate(rate: f32) -> f32 {
    if !rate.is_finite() || rate <= 0.0 {
        return 1.0;
    }
    rate.clamp(MIN_RATE, MAX_RATE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSettings {
    pub rate: f32,
    /// Gap between one chunk finishing and the next being submitted.
    pub chunk_pause: Duration,
    /// Delay before resuming after rewind, forward or seek.
    pub settle_delay: Duration,
    pub seek_step: usize,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        crate::config::AppConfig::default().playback_settings()
    }
}

/// Derived reading progress. Everything here is computed from the position.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressView {
    pub state: PlaybackState,
    pub position: usize,
    pub total: usize,
    pub page: Option<usize>,
    pub percent: f64,
}

/// Work the driver performs on behalf of the controller, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    CancelSpeech,
    Speak(SpeechRequest),
    /// Call [`PlaybackController::on_timer`] with `timer` after `delay`.
    ScheduleResume { delay: Duration, timer: u64 },
    KeepAliveStart,
    KeepAliveStop,
    Progress(ProgressView),
}

/// Outward control surface.
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderCommand {
    Play,
    Pause,
    Toggle,
    Rewind,
    Forward,
    Seek { percent: f64 },
    Reset,
    SetRate { rate: f32 },
    SetNarratorVoice { voice_id: String },
    SetDialogueVoice { voice_id: String },
    SetSmartVoices { enabled: bool },
}

impl ReaderCommand {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Play => "reader_play",
            Self::Pause => "reader_pause",
            Self::Toggle => "reader_toggle",
            Self::Rewind => "reader_rewind",
            Self::Forward => "reader_forward",
            Self::Seek { .. } => "reader_seek",
            Self::Reset => "reader_reset",
            Self::SetRate { .. } => "reader_set_rate",
            Self::SetNarratorVoice { .. } => "reader_set_narrator_voice",
            Self::SetDialogueVoice { .. } => "reader_set_dialogue_voice",
            Self::SetSmartVoices { .. } => "reader_set_smart_voices",
        }
    }
}

/// Everything tied to one loaded document. Replaced wholesale on load and
/// dropped on reset.
#[derive(Debug)]
struct Session {
    chunks: Vec<Chunk>,
    page_count: usize,
    position: usize,
    assignments: VoiceAssignment,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    seq: u64,
    position: usize,
}

#[derive(Debug)]
pub struct PlaybackController {
    settings: PlaybackSettings,
    voices: VoiceAssigner,
    session: Option<Session>,
    state: PlaybackState,
    last_seq: u64,
    in_flight: Option<InFlight>,
    timer: u64,
}

impl PlaybackController {
    pub fn new(settings: PlaybackSettings, voices: VoiceAssigner) -> Self {
        Self {
            settings,
            voices,
            session: None,
            state: PlaybackState::Idle,
            last_seq: 0,
            in_flight: None,
            timer: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn position(&self) -> usize {
        self.session.as_ref().map(|s| s.position).unwrap_or(0)
    }

    pub fn chunk_count(&self) -> usize {
        self.session.as_ref().map(|s| s.chunks.len()).unwrap_or(0)
    }

    pub fn page_count(&self) -> usize {
        self.session.as_ref().map(|s| s.page_count).unwrap_or(0)
    }

    pub fn current_chunk(&self) -> Option<&Chunk> {
        let session = self.session.as_ref()?;
        session.chunks.get(session.position)
    }

    pub fn assignments(&self) -> Option<&VoiceAssignment> {
        self.session.as_ref().map(|s| &s.assignments)
    }

    pub fn voices(&self) -> &VoiceAssigner {
        &self.voices
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    pub fn progress(&self) -> ProgressView {
        let Some(session) = &self.session else {
            return ProgressView {
                state: self.state,
                position: 0,
                total: 0,
                page: None,
                percent: 0.0,
            };
        };
        let total = session.chunks.len();
        let percent = if total == 0 {
            0.0
        } else {
            (((session.position + 1) as f64 / total as f64) * 1000.0).round() / 10.0
        };
        ProgressView {
            state: self.state,
            position: session.position,
            total,
            page: session.chunks.get(session.position).map(|chunk| chunk.page),
            percent,
        }
    }

    pub fn apply_command(&mut self, command: ReaderCommand) -> Result<Vec<Effect>> {
        debug!(action = command.action(), "Applying reader command");
        let effects = match command {
            ReaderCommand::Play => self.play(),
            ReaderCommand::Pause => self.pause(),
            ReaderCommand::Toggle => self.toggle(),
            ReaderCommand::Rewind => self.rewind(),
            ReaderCommand::Forward => self.forward(),
            ReaderCommand::Seek { percent } => self.seek_to_percent(percent),
            ReaderCommand::Reset => self.reset(),
            ReaderCommand::SetRate { rate } => {
                self.set_rate(rate)?;
                Vec::new()
            }
            ReaderCommand::SetNarratorVoice { voice_id } => {
                self.voices.set_narrator_voice(&voice_id)?;
                Vec::new()
            }
            ReaderCommand::SetDialogueVoice { voice_id } => {
                self.voices.set_dialogue_voice(&voice_id)?;
                Vec::new()
            }
            ReaderCommand::SetSmartVoices { enabled } => {
                self.voices.set_smart_voices(enabled);
                Vec::new()
            }
        };
        Ok(effects)
    }

    /// Install a new document. Any speech in flight is abandoned and the
    /// previous session, including its speaker voices, is discarded.
    pub fn load_document(&mut self, document: Document) -> Vec<Effect> {
        let before = self.state;
        let mut effects = Vec::new();
        self.abandon_speech(&mut effects);
        info!(
            chunks = document.chunks.len(),
            pages = document.pages.len(),
            "Installing document"
        );
        self.session = Some(Session {
            page_count: document.pages.len(),
            chunks: document.chunks,
            position: 0,
            assignments: VoiceAssignment::default(),
        });
        self.state = PlaybackState::Paused;
        self.commit(before, effects)
    }

    pub fn reset(&mut self) -> Vec<Effect> {
        let before = self.state;
        let mut effects = Vec::new();
        self.abandon_speech(&mut effects);
        self.session = None;
        self.state = PlaybackState::Idle;
        info!("Reader reset");
        self.commit(before, effects)
    }

    pub fn play(&mut self) -> Vec<Effect> {
        if self.chunk_count() == 0 {
            debug!("Play ignored; no chunks loaded");
            return Vec::new();
        }
        if self.state == PlaybackState::Playing {
            return Vec::new();
        }
        let before = self.state;
        let mut effects = Vec::new();
        self.state = PlaybackState::Playing;
        info!(position = self.position(), "Starting playback");
        self.speak_current(&mut effects);
        self.commit(before, effects)
    }

    /// Stop immediately. The in-flight utterance is cancelled, not drained.
    pub fn pause(&mut self) -> Vec<Effect> {
        if self.session.is_none() {
            return Vec::new();
        }
        let before = self.state;
        let mut effects = Vec::new();
        self.abandon_speech(&mut effects);
        self.state = PlaybackState::Paused;
        info!(position = self.position(), "Paused playback");
        self.commit(before, effects)
    }

    pub fn toggle(&mut self) -> Vec<Effect> {
        if self.state == PlaybackState::Playing {
            self.pause()
        } else {
            self.play()
        }
    }

    pub fn rewind(&mut self) -> Vec<Effect> {
        let target = self.position().saturating_sub(self.settings.seek_step);
        self.jump_to(target)
    }

    pub fn forward(&mut self) -> Vec<Effect> {
        let last = self.chunk_count().saturating_sub(1);
        let target = self
            .position()
            .saturating_add(self.settings.seek_step)
            .min(last);
        self.jump_to(target)
    }

    /// Jump to `floor(percent * chunk_count)`, clamped to the last chunk.
    pub fn seek_to_percent(&mut self, percent: f64) -> Vec<Effect> {
        let count = self.chunk_count();
        if count == 0 {
            return Vec::new();
        }
        let fraction = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 1.0)
        };
        let target = ((fraction * count as f64).floor() as usize).min(count - 1);
        self.jump_to(target)
    }

    pub fn set_rate(&mut self, rate: f32) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ReaderError::InvalidRate(rate));
        }
        self.settings.rate = clamp_rate(rate);
        info!(rate = self.settings.rate, "Speech rate updated");
        Ok(())
    }

    pub fn on_voices_changed(&mut self, voices: Vec<Voice>) {
        self.voices.reload_catalog(voices);
    }

    /// Terminal event from the backend for request `event.seq`.
    pub fn on_speech_event(&mut self, event: SpeechEvent) -> Vec<Effect> {
        let Some(in_flight) = self.in_flight.filter(|f| f.seq == event.seq) else {
            debug!(
                seq = event.seq,
                current = ?self.in_flight.map(|f| f.seq),
                "Ignoring stale speech event"
            );
            return Vec::new();
        };
        self.in_flight = None;

        let before = self.state;
        let mut effects = Vec::new();
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        if in_flight.position != session.position {
            debug!(seq = event.seq, "Ignoring speech event for moved position");
            return Vec::new();
        }

        match &event.outcome {
            SynthesisOutcome::Completed => {
                debug!(seq = event.seq, position = session.position, "Chunk finished")
            }
            SynthesisOutcome::Failed(reason) => warn!(
                seq = event.seq,
                position = session.position,
                "Speech synthesis failed; skipping chunk: {reason}"
            ),
        }

        if session.position + 1 >= session.chunks.len() {
            info!(position = session.position, "Reached end of document");
            self.state = PlaybackState::Paused;
        } else {
            session.position += 1;
            if self.state == PlaybackState::Playing {
                self.schedule(self.settings.chunk_pause, &mut effects);
            }
        }
        self.commit(before, effects)
    }

    /// A timer armed by [`Effect::ScheduleResume`] fired.
    pub fn on_timer(&mut self, timer: u64) -> Vec<Effect> {
        if timer != self.timer || self.state != PlaybackState::Playing || self.in_flight.is_some()
        {
            debug!(timer, current = self.timer, "Ignoring superseded timer");
            return Vec::new();
        }
        let before = self.state;
        let mut effects = Vec::new();
        self.speak_current(&mut effects);
        self.commit(before, effects)
    }

    fn jump_to(&mut self, target: usize) -> Vec<Effect> {
        let Some(current) = self.session.as_ref().map(|s| s.position) else {
            return Vec::new();
        };
        if self.chunk_count() == 0 || target == current {
            return Vec::new();
        }
        let before = self.state;
        let mut effects = Vec::new();
        self.abandon_speech(&mut effects);
        if let Some(session) = self.session.as_mut() {
            session.position = target;
        }
        debug!(from = current, to = target, "Moved playback position");
        if before == PlaybackState::Playing {
            self.schedule(self.settings.settle_delay, &mut effects);
        } else {
            self.state = PlaybackState::Paused;
        }
        self.commit(before, effects)
    }

    fn speak_current(&mut self, effects: &mut Vec<Effect>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if self.state != PlaybackState::Playing || session.position >= session.chunks.len() {
            self.state = PlaybackState::Paused;
            return;
        }

        let chunk = &session.chunks[session.position];
        let voice = self.voices.resolve(chunk, &mut session.assignments);
        let pitch = self.voices.pitch_for(chunk);
        self.last_seq += 1;
        let request = SpeechRequest {
            seq: self.last_seq,
            text: chunk.text.clone(),
            voice,
            rate: self.settings.rate,
            pitch,
        };
        debug!(
            seq = request.seq,
            position = session.position,
            page = chunk.page,
            dialogue = chunk.is_dialogue,
            speaker = chunk.speaker.as_deref().unwrap_or(""),
            voice = request.voice.as_deref().unwrap_or("<default>"),
            "Submitting chunk"
        );
        self.in_flight = Some(InFlight {
            seq: request.seq,
            position: session.position,
        });
        effects.push(Effect::CancelSpeech);
        effects.push(Effect::Speak(request));
    }

    fn schedule(&mut self, delay: Duration, effects: &mut Vec<Effect>) {
        self.timer = self.timer.wrapping_add(1);
        effects.push(Effect::ScheduleResume {
            delay,
            timer: self.timer,
        });
    }

    fn abandon_speech(&mut self, effects: &mut Vec<Effect>) {
        self.in_flight = None;
        self.timer = self.timer.wrapping_add(1);
        effects.push(Effect::CancelSpeech);
    }

    fn commit(&self, before: PlaybackState, mut effects: Vec<Effect>) -> Vec<Effect> {
        let was_playing = before == PlaybackState::Playing;
        let is_playing = self.state == PlaybackState::Playing;
        if !was_playing && is_playing {
            effects.push(Effect::KeepAliveStart);
        } else if was_playing && !is_playing {
            effects.push(Effect::KeepAliveStop);
        }
        effects.push(Effect::Progress(self.progress()));
        effects
    }
}
