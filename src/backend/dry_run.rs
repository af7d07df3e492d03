use super::{Completion, SpeechBackend, SpeechRequest};
use crate::cancellation::CancellationToken;
use crate::voices::Voice;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const BASE_WORDS_PER_MINUTE: f32 = 170.0;
const MAX_TIME_SCALE: f32 = 1000.0;

/// Backend that logs each utterance and waits as long as a real voice would
/// take to say it. No audio is produced.
#[derive(Debug)]
pub struct DryRunBackend {
    voices: Vec<Voice>,
    /// Multiplies the simulated speaking time; `0.0` finishes instantly.
    time_scale: f32,
    ready_at: Instant,
    current: Option<CancellationToken>,
}

impl Default for DryRunBackend {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl DryRunBackend {
    pub fn new(time_scale: f32) -> Self {
        Self {
            voices: default_voices(),
            time_scale: sanitize_time_scale(time_scale),
            ready_at: Instant::now(),
            current: None,
        }
    }

    /// Report not-ready until `warmup` has passed.
    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.ready_at = Instant::now() + warmup;
        self
    }

    pub fn with_voices(mut self, voices: Vec<Voice>) -> Self {
        self.voices = voices;
        self
    }

    fn speaking_time(&self, request: &SpeechRequest) -> Duration {
        let words = request.text.split_whitespace().count().max(1) as f32;
        let minutes = words / (BASE_WORDS_PER_MINUTE * request.rate.max(0.1));
        Duration::from_secs_f32(minutes * 60.0 * self.time_scale)
    }
}

impl SpeechBackend for DryRunBackend {
    fn is_ready(&self) -> bool {
        Instant::now() >= self.ready_at
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&mut self, request: SpeechRequest, completion: Completion) {
        self.cancel_current();
        let duration = self.speaking_time(&request);
        info!(
            seq = request.seq,
            voice = request.voice.as_deref().unwrap_or("<default>"),
            rate = request.rate,
            pitch = request.pitch,
            "Speaking: {}",
            request.text
        );

        let token = CancellationToken::new();
        self.current = Some(token.clone());
        thread::spawn(move || {
            if token.sleep(duration) {
                completion.completed();
            } else {
                debug!(seq = completion.seq(), "Dry-run utterance cancelled");
                completion.failed("cancelled");
            }
        });
    }

    fn cancel_current(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }
}

/// Non-finite scales read as real time; the rest is clamped to
/// `[0, MAX_TIME_SCALE]`.
fn sanitize_time_scale(time_scale: f32) -> f32 {
    if !time_scale.is_finite() {
        return 1.0;
    }
    time_scale.clamp(0.0, MAX_TIME_SCALE)
}

fn default_voices() -> Vec<Voice> {
    vec![
        Voice::new("dry-run/daniel", "Daniel", "en-GB"),
        Voice::new("dry-run/samantha", "Samantha", "en-US"),
        Voice::new("dry-run/alex", "Alex", "en-US"),
        Voice::new("dry-run/moira", "Moira", "en-IE"),
        Voice::new("dry-run/anna", "Anna", "de-DE"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SpeechEvent, SynthesisOutcome};
    use crate::reader::ReaderEvent;
    use std::sync::mpsc;

    fn request(seq: u64, text: &str) -> SpeechRequest {
        SpeechRequest {
            seq,
            text: text.to_string(),
            voice: None,
            rate: 1.0,
            pitch: 1.0,
        }
    }

    fn next_speech(rx: &mpsc::Receiver<ReaderEvent>) -> SpeechEvent {
        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            ReaderEvent::Speech(event) => event,
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn instant_backend_completes_request() {
        let (tx, rx) = mpsc::channel();
        let mut backend = DryRunBackend::new(0.0);
        backend.speak(request(1, "Hello there."), Completion::new(1, tx));
        let event = next_speech(&rx);
        assert_eq!(event.seq, 1);
        assert_eq!(event.outcome, SynthesisOutcome::Completed);
    }

    #[test]
    fn cancel_interrupts_long_utterance() {
        let (tx, rx) = mpsc::channel();
        let mut backend = DryRunBackend::new(100.0);
        backend.speak(request(2, "A long sentence to read."), Completion::new(2, tx));
        backend.cancel_current();
        backend.cancel_current();
        let event = next_speech(&rx);
        assert_eq!(event.seq, 2);
        assert_eq!(
            event.outcome,
            SynthesisOutcome::Failed("cancelled".to_string())
        );
    }

    #[test]
    fn faster_rate_shortens_speaking_time() {
        let backend = DryRunBackend::new(1.0);
        let slow = backend.speaking_time(&request(1, "one two three four"));
        let mut fast_request = request(1, "one two three four");
        fast_request.rate = 2.0;
        assert!(backend.speaking_time(&fast_request) < slow);
    }

    #[test]
    fn unusable_time_scale_does_not_panic() {
        assert_eq!(DryRunBackend::new(f32::INFINITY).time_scale, 1.0);
        assert_eq!(DryRunBackend::new(f32::NAN).time_scale, 1.0);
        assert_eq!(DryRunBackend::new(-2.0).time_scale, 0.0);
        let huge = DryRunBackend::new(1e30);
        assert_eq!(huge.time_scale, MAX_TIME_SCALE);
        assert!(huge.speaking_time(&request(1, "one two")) > Duration::ZERO);
    }

    #[test]
    fn warmup_delays_readiness() {
        let backend = DryRunBackend::new(0.0).with_warmup(Duration::from_secs(60));
        assert!(!backend.is_ready());
        assert!(DryRunBackend::new(0.0).is_ready());
    }
}
