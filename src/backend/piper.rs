//! Piper synthesis with rodio playback.
//!
//! Each `.onnx` model under the voices directory is one voice. Utterances are
//! rendered to WAV in the cache directory, keyed by a hash of everything that
//! affects the audio, then played on a worker thread.

use super::{Completion, SpeechBackend, SpeechRequest};
use crate::cancellation::CancellationToken;
use crate::voices::Voice;
use anyhow::{Context, Result, anyhow};
use piper_rs::{PiperModel, from_config_path};
use piper_rs::synth::{AudioOutputConfig, PiperSpeechSynthesizer};
use rodio::{Decoder, OutputStream, Sink};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const PLAYBACK_POLL: Duration = Duration::from_millis(20);

type SharedModel = Arc<dyn PiperModel + Send + Sync>;

/// Loaded models keyed by `.onnx` path, shared with worker threads so each
/// voice is loaded once.
#[derive(Clone, Default)]
struct ModelCache {
    models: Arc<Mutex<HashMap<PathBuf, SharedModel>>>,
}

impl ModelCache {
    fn get_or_load(&self, model: &Path) -> Result<SharedModel> {
        let mut models = self
            .models
            .lock()
            .map_err(|_| anyhow!("Piper model cache poisoned"))?;
        if let Some(loaded) = models.get(model) {
            return Ok(Arc::clone(loaded));
        }
        let config_path = model.with_extension("onnx.json");
        if !config_path.exists() {
            anyhow::bail!("Piper config not found at {}", config_path.display());
        }
        let loaded = from_config_path(&config_path).context("Loading Piper model")?;
        info!(model = %model.display(), "Loaded Piper model");
        models.insert(model.to_path_buf(), Arc::clone(&loaded));
        Ok(loaded)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.models.lock().map(|models| models.len()).unwrap_or(0)
    }
}

pub struct PiperBackend {
    voices_dir: PathBuf,
    cache_dir: PathBuf,
    voices: Vec<Voice>,
    models: ModelCache,
    current: Option<CancellationToken>,
}

impl PiperBackend {
    pub fn new(voices_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let voices_dir = voices_dir.into();
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Creating cache dir {}", cache_dir.display()))?;
        let mut backend = Self {
            voices_dir,
            cache_dir,
            voices: Vec::new(),
            models: ModelCache::default(),
            current: None,
        };
        backend.rescan()?;
        Ok(backend)
    }

    /// Re-read the voices directory.
    pub fn rescan(&mut self) -> Result<()> {
        let mut models = Vec::new();
        collect_models(&self.voices_dir, &mut models)
            .with_context(|| format!("Scanning {}", self.voices_dir.display()))?;
        models.sort();
        self.voices = models.iter().map(|path| voice_from_model(path)).collect();
        info!(
            dir = %self.voices_dir.display(),
            voices = self.voices.len(),
            "Scanned Piper voices"
        );
        Ok(())
    }

    fn model_for(&self, voice: Option<&str>) -> Option<PathBuf> {
        let id = voice.or_else(|| self.voices.first().map(|v| v.id.as_str()))?;
        Some(PathBuf::from(id))
    }
}

impl SpeechBackend for PiperBackend {
    fn is_ready(&self) -> bool {
        !self.voices.is_empty()
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&mut self, request: SpeechRequest, completion: Completion) {
        self.cancel_current();
        let Some(model) = self.model_for(request.voice.as_deref()) else {
            completion.failed("no Piper voice available");
            return;
        };
        let token = CancellationToken::new();
        self.current = Some(token.clone());
        let cache_dir = self.cache_dir.clone();
        let models = self.models.clone();

        thread::spawn(move || {
            let seq = request.seq;
            match render_and_play(&models, &model, &cache_dir, &request, &token) {
                Ok(true) => completion.completed(),
                Ok(false) => {
                    debug!(seq, "Piper utterance cancelled");
                    completion.failed("cancelled");
                }
                Err(err) => {
                    warn!(seq, "Piper utterance failed: {err:#}");
                    completion.failed(format!("{err:#}"));
                }
            }
        });
    }

    fn cancel_current(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }
}

/// Returns `Ok(false)` when cancelled before the audio finished.
fn render_and_play(
    models: &ModelCache,
    model: &Path,
    cache_dir: &Path,
    request: &SpeechRequest,
    token: &CancellationToken,
) -> Result<bool> {
    let path = cache_path(cache_dir, model, request);
    if !path.exists() {
        synthesize(models.get_or_load(model)?, &path, request)?;
    }
    if token.is_cancelled() {
        return Ok(false);
    }

    let (_stream, handle) = OutputStream::try_default().context("Opening audio output")?;
    let sink = Sink::try_new(&handle).context("Creating sink")?;
    let source = Decoder::new(BufReader::new(File::open(&path)?)).context("Decoding audio")?;
    sink.append(source);
    sink.play();
    while !sink.empty() {
        if token.is_cancelled() {
            sink.stop();
            return Ok(false);
        }
        thread::sleep(PLAYBACK_POLL);
    }
    Ok(true)
}

fn synthesize(model: SharedModel, path: &Path, request: &SpeechRequest) -> Result<()> {
    let synth = PiperSpeechSynthesizer::new(model).context("Preparing Piper synthesizer")?;
    let output_config = AudioOutputConfig {
        rate: Some(rate_to_percent(request.rate)),
        volume: None,
        pitch: Some(pitch_to_percent(request.pitch)),
        appended_silence_ms: None,
    };
    debug!(
        path = %path.display(),
        chars = request.text.chars().count(),
        "Synthesizing chunk with Piper"
    );
    synth
        .synthesize_to_file(path, request.text.clone(), Some(output_config))
        .context("Synthesizing audio")?;
    Ok(())
}

fn cache_path(base: &Path, model: &Path, request: &SpeechRequest) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(model.as_os_str().to_string_lossy().as_bytes());
    hasher.update(request.text.as_bytes());
    hasher.update(request.rate.to_le_bytes());
    hasher.update(request.pitch.to_le_bytes());
    let hash = format!("{:x}", hasher.finalize());
    base.join(format!("utterance-{hash}.wav"))
}

fn collect_models(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_models(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "onnx") {
            out.push(path);
        }
    }
    Ok(())
}

/// `en_US-ryan-high.onnx` becomes `Ryan` speaking `en-US`.
fn voice_from_model(path: &Path) -> Voice {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut parts = stem.split('-');
    let language = parts.next().unwrap_or_default().replace('_', "-");
    let name = parts.next().map(capitalize).unwrap_or_else(|| stem.clone());
    Voice::new(path.to_string_lossy(), name, language)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn rate_to_percent(rate: f32) -> u8 {
    let clamped = rate.clamp(0.5, 5.5);
    let percent = ((clamped - 0.5) / 5.0) * 100.0;
    percent.round().clamp(0.0, 100.0) as u8
}

fn pitch_to_percent(pitch: f32) -> u8 {
    let clamped = pitch.clamp(0.5, 1.5);
    ((clamped - 0.5) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_file_name_maps_to_voice() {
        let voice = voice_from_model(Path::new("/voices/en/en_US-ryan-high.onnx"));
        assert_eq!(voice.name, "Ryan");
        assert_eq!(voice.language, "en-US");
        assert_eq!(voice.id, "/voices/en/en_US-ryan-high.onnx");
    }

    #[test]
    fn cache_key_depends_on_pitch() {
        let base = Path::new("/tmp/cache");
        let model = Path::new("/voices/a.onnx");
        let mut request = SpeechRequest {
            seq: 1,
            text: "Hello.".to_string(),
            voice: None,
            rate: 1.0,
            pitch: 1.0,
        };
        let narration = cache_path(base, model, &request);
        request.pitch = 1.2;
        request.seq = 7;
        assert_ne!(cache_path(base, model, &request), narration);
    }

    #[test]
    fn missing_model_config_is_not_cached() {
        let cache = ModelCache::default();
        let shared = cache.clone();
        let err = cache
            .get_or_load(Path::new("/definitely/not/here/en_US-ryan-high.onnx"))
            .err()
            .unwrap();
        assert!(err.to_string().contains("Piper config not found"));
        assert_eq!(shared.len(), 0);
    }

    #[test]
    fn rate_and_pitch_map_into_percent_range() {
        assert_eq!(rate_to_percent(0.1), 0);
        assert_eq!(rate_to_percent(9.0), 100);
        assert_eq!(pitch_to_percent(1.0), 50);
        assert_eq!(pitch_to_percent(1.2), 70);
    }
}
