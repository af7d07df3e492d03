use crate::chunker::ChunkPolicy;
use crate::config::defaults;
use crate::document::PipelineSettings;
use crate::playback::PlaybackSettings;
use crate::voices::VoicePreferences;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// High-level app configuration; built from the TOML tables in `tables.rs`.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub log_level: LogLevel,
    pub paragraph_gap: f32,
    pub chunk_min_chars: usize,
    pub chunk_soft_max_chars: usize,
    pub chunk_hard_max_chars: usize,
    pub voice_language: String,
    pub smart_voices: bool,
    pub male_voice_hints: Vec<String>,
    pub female_voice_hints: Vec<String>,
    pub dialogue_pitch: f32,
    pub narration_pitch: f32,
    pub speech_rate: f32,
    pub chunk_pause_ms: u64,
    pub seek_step: usize,
    pub settle_delay_ms: u64,
    pub backend_ready_timeout_ms: u64,
    pub backend_poll_interval_ms: u64,
    pub backend: BackendKind,
    pub piper_voices_dir: String,
    pub cache_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            log_level: defaults::default_log_level(),
            paragraph_gap: defaults::default_paragraph_gap(),
            chunk_min_chars: defaults::default_chunk_min_chars(),
            chunk_soft_max_chars: defaults::default_chunk_soft_max_chars(),
            chunk_hard_max_chars: defaults::default_chunk_hard_max_chars(),
            voice_language: defaults::default_voice_language(),
            smart_voices: defaults::default_smart_voices(),
            male_voice_hints: defaults::default_male_hints(),
            female_voice_hints: defaults::default_female_hints(),
            dialogue_pitch: defaults::default_dialogue_pitch(),
            narration_pitch: defaults::default_narration_pitch(),
            speech_rate: defaults::default_speech_rate(),
            chunk_pause_ms: defaults::default_chunk_pause_ms(),
            seek_step: defaults::default_seek_step(),
            settle_delay_ms: defaults::default_settle_delay_ms(),
            backend_ready_timeout_ms: defaults::default_backend_ready_timeout_ms(),
            backend_poll_interval_ms: defaults::default_backend_poll_interval_ms(),
            backend: BackendKind::default(),
            piper_voices_dir: defaults::default_piper_voices_dir(),
            cache_dir: defaults::default_cache_dir(),
        }
    }
}

impl AppConfig {
    pub fn chunk_policy(&self) -> ChunkPolicy {
        ChunkPolicy::new(
            self.chunk_min_chars,
            self.chunk_soft_max_chars,
            self.chunk_hard_max_chars,
        )
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            paragraph_gap: self.paragraph_gap.max(0.0),
            chunk_policy: self.chunk_policy(),
        }
    }

    pub fn voice_preferences(&self) -> VoicePreferences {
        VoicePreferences {
            language: self.voice_language.clone(),
            male_hints: self.male_voice_hints.clone(),
            female_hints: self.female_voice_hints.clone(),
            dialogue_pitch: self.dialogue_pitch,
            narration_pitch: self.narration_pitch,
        }
    }

    pub fn playback_settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            rate: crate::playback::clamp_rate(self.speech_rate),
            chunk_pause: Duration::from_millis(self.chunk_pause_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            seek_step: self.seek_step.max(1),
        }
    }

    pub fn backend_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_ready_timeout_ms)
    }

    pub fn backend_poll_interval(&self) -> Duration {
        Duration::from_millis(self.backend_poll_interval_ms.max(1))
    }

    pub fn cache_dir(&self) -> PathBuf {
        PathBuf::from(&self.cache_dir)
    }
}

/// Which synthesis backend the binary drives.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    #[default]
    DryRun,
    Piper,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            BackendKind::DryRun => "dry-run",
            BackendKind::Piper => "piper",
        };
        write!(f, "{}", label)
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Debug
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
