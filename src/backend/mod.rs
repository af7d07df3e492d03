//! Speech synthesis backends.
//!
//! A backend accepts one utterance at a time and reports its end through the
//! [`Completion`] handed to it with the request. Completions land on the
//! reader's event channel tagged with the request's sequence number; the
//! playback controller decides whether the event is still current.

mod dry_run;
#[cfg(feature = "piper")]
mod piper;

pub use dry_run::DryRunBackend;
#[cfg(feature = "piper")]
pub use piper::PiperBackend;

use crate::reader::ReaderEvent;
use crate::voices::Voice;
use std::sync::mpsc::Sender;
use tracing::trace;

/// One utterance to synthesize and play.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub seq: u64,
    pub text: String,
    /// `None` leaves the choice to the backend.
    pub voice: Option<String>,
    pub rate: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutcome {
    Completed,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechEvent {
    pub seq: u64,
    pub outcome: SynthesisOutcome,
}

/// Delivers exactly one terminal event for a request. Dropping it unfinished
/// reports a failure so the reader never waits on a lost utterance.
#[derive(Debug)]
pub struct Completion {
    seq: u64,
    events: Option<Sender<ReaderEvent>>,
}

impl Completion {
    pub fn new(seq: u64, events: Sender<ReaderEvent>) -> Self {
        Self {
            seq,
            events: Some(events),
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn finish(mut self, outcome: SynthesisOutcome) {
        self.send(outcome);
    }

    pub fn completed(self) {
        self.finish(SynthesisOutcome::Completed);
    }

    pub fn failed(self, reason: impl Into<String>) {
        self.finish(SynthesisOutcome::Failed(reason.into()));
    }

    fn send(&mut self, outcome: SynthesisOutcome) {
        let Some(events) = self.events.take() else {
            return;
        };
        trace!(seq = self.seq, ?outcome, "Speech finished");
        // The reader may already be gone; nothing left to notify.
        let _ = events.send(ReaderEvent::Speech(SpeechEvent {
            seq: self.seq,
            outcome,
        }));
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.send(SynthesisOutcome::Failed("utterance dropped".to_string()));
    }
}

pub trait SpeechBackend {
    /// Whether the engine can accept requests yet.
    fn is_ready(&self) -> bool {
        true
    }

    fn voices(&self) -> Vec<Voice>;

    /// Start speaking. Must not block until the utterance ends.
    fn speak(&mut self, request: SpeechRequest, completion: Completion);

    /// Stop whatever is being spoken. Safe to call when idle.
    fn cancel_current(&mut self);
}

impl<B: SpeechBackend + ?Sized> SpeechBackend for Box<B> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn voices(&self) -> Vec<Voice> {
        (**self).voices()
    }

    fn speak(&mut self, request: SpeechRequest, completion: Completion) {
        (**self).speak(request, completion)
    }

    fn cancel_current(&mut self) {
        (**self).cancel_current()
    }
}
