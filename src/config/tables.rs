use super::defaults;
use super::models::{AppConfig, BackendKind, LogLevel};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    layout: LayoutConfig,
    #[serde(default)]
    chunking: ChunkingConfig,
    #[serde(default)]
    voices: VoicesConfig,
    #[serde(default)]
    playback: PlaybackConfig,
    #[serde(default)]
    backend: BackendConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            log_level: tables.logging.log_level,
            paragraph_gap: tables.layout.paragraph_gap,
            chunk_min_chars: tables.chunking.min_chars,
            chunk_soft_max_chars: tables.chunking.soft_max_chars,
            chunk_hard_max_chars: tables.chunking.hard_max_chars,
            voice_language: tables.voices.language,
            smart_voices: tables.voices.smart_voices,
            male_voice_hints: tables.voices.male_hints,
            female_voice_hints: tables.voices.female_hints,
            dialogue_pitch: tables.voices.dialogue_pitch,
            narration_pitch: tables.voices.narration_pitch,
            speech_rate: tables.playback.rate,
            chunk_pause_ms: tables.playback.chunk_pause_ms,
            seek_step: tables.playback.seek_step,
            settle_delay_ms: tables.playback.settle_delay_ms,
            backend_ready_timeout_ms: tables.playback.backend_ready_timeout_ms,
            backend_poll_interval_ms: tables.playback.backend_poll_interval_ms,
            backend: tables.backend.kind,
            piper_voices_dir: tables.backend.piper_voices_dir,
            cache_dir: tables.backend.cache_dir,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            logging: LoggingConfig {
                log_level: config.log_level,
            },
            layout: LayoutConfig {
                paragraph_gap: config.paragraph_gap,
            },
            chunking: ChunkingConfig {
                min_chars: config.chunk_min_chars,
                soft_max_chars: config.chunk_soft_max_chars,
                hard_max_chars: config.chunk_hard_max_chars,
            },
            voices: VoicesConfig {
                language: config.voice_language.clone(),
                smart_voices: config.smart_voices,
                male_hints: config.male_voice_hints.clone(),
                female_hints: config.female_voice_hints.clone(),
                dialogue_pitch: config.dialogue_pitch,
                narration_pitch: config.narration_pitch,
            },
            playback: PlaybackConfig {
                rate: config.speech_rate,
                chunk_pause_ms: config.chunk_pause_ms,
                seek_step: config.seek_step,
                settle_delay_ms: config.settle_delay_ms,
                backend_ready_timeout_ms: config.backend_ready_timeout_ms,
                backend_poll_interval_ms: config.backend_poll_interval_ms,
            },
            backend: BackendConfig {
                kind: config.backend,
                piper_voices_dir: config.piper_voices_dir.clone(),
                cache_dir: config.cache_dir.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LayoutConfig {
    #[serde(default = "defaults::default_paragraph_gap")]
    paragraph_gap: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            paragraph_gap: defaults::default_paragraph_gap(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ChunkingConfig {
    #[serde(default = "defaults::default_chunk_min_chars")]
    min_chars: usize,
    #[serde(default = "defaults::default_chunk_soft_max_chars")]
    soft_max_chars: usize,
    #[serde(default = "defaults::default_chunk_hard_max_chars")]
    hard_max_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        ChunkingConfig {
            min_chars: defaults::default_chunk_min_chars(),
            soft_max_chars: defaults::default_chunk_soft_max_chars(),
            hard_max_chars: defaults::default_chunk_hard_max_chars(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct VoicesConfig {
    #[serde(default = "defaults::default_voice_language")]
    language: String,
    #[serde(default = "defaults::default_smart_voices")]
    smart_voices: bool,
    #[serde(default = "defaults::default_male_hints")]
    male_hints: Vec<String>,
    #[serde(default = "defaults::default_female_hints")]
    female_hints: Vec<String>,
    #[serde(default = "defaults::default_dialogue_pitch")]
    dialogue_pitch: f32,
    #[serde(default = "defaults::default_narration_pitch")]
    narration_pitch: f32,
}

impl Default for VoicesConfig {
    fn default() -> Self {
        VoicesConfig {
            language: defaults::default_voice_language(),
            smart_voices: defaults::default_smart_voices(),
            male_hints: defaults::default_male_hints(),
            female_hints: defaults::default_female_hints(),
            dialogue_pitch: defaults::default_dialogue_pitch(),
            narration_pitch: defaults::default_narration_pitch(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct PlaybackConfig {
    #[serde(default = "defaults::default_speech_rate")]
    rate: f32,
    #[serde(default = "defaults::default_chunk_pause_ms")]
    chunk_pause_ms: u64,
    #[serde(default = "defaults::default_seek_step")]
    seek_step: usize,
    #[serde(default = "defaults::default_settle_delay_ms")]
    settle_delay_ms: u64,
    #[serde(default = "defaults::default_backend_ready_timeout_ms")]
    backend_ready_timeout_ms: u64,
    #[serde(default = "defaults::default_backend_poll_interval_ms")]
    backend_poll_interval_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            rate: defaults::default_speech_rate(),
            chunk_pause_ms: defaults::default_chunk_pause_ms(),
            seek_step: defaults::default_seek_step(),
            settle_delay_ms: defaults::default_settle_delay_ms(),
            backend_ready_timeout_ms: defaults::default_backend_ready_timeout_ms(),
            backend_poll_interval_ms: defaults::default_backend_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct BackendConfig {
    #[serde(default)]
    kind: BackendKind,
    #[serde(default = "defaults::default_piper_voices_dir")]
    piper_voices_dir: String,
    #[serde(default = "defaults::default_cache_dir")]
    cache_dir: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            kind: BackendKind::default(),
            piper_voices_dir: defaults::default_piper_voices_dir(),
            cache_dir: defaults::default_cache_dir(),
        }
    }
}
