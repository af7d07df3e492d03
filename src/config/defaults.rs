pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Debug
}

pub(crate) fn default_paragraph_gap() -> f32 {
    crate::layout::DEFAULT_PARAGRAPH_GAP
}

pub(crate) fn default_chunk_min_chars() -> usize {
    crate::chunker::DEFAULT_MIN_CHARS
}

pub(crate) fn default_chunk_soft_max_chars() -> usize {
    crate::chunker::DEFAULT_SOFT_MAX_CHARS
}

pub(crate) fn default_chunk_hard_max_chars() -> usize {
    crate::chunker::DEFAULT_HARD_MAX_CHARS
}

pub(crate) fn default_voice_language() -> String {
    "en".to_string()
}

pub(crate) fn default_smart_voices() -> bool {
    true
}

pub(crate) fn default_male_hints() -> Vec<String> {
    [
        "daniel", "david", "fred", "george", "james", "ryan", "thomas", "arthur", "guy", "alex",
    ]
    .iter()
    .map(|hint| hint.to_string())
    .collect()
}

pub(crate) fn default_female_hints() -> Vec<String> {
    [
        "female", "samantha", "victoria", "karen", "zira", "susan", "kate", "serena", "fiona",
        "moira", "amy",
    ]
    .iter()
    .map(|hint| hint.to_string())
    .collect()
}

pub(crate) fn default_dialogue_pitch() -> f32 {
    1.2
}

pub(crate) fn default_narration_pitch() -> f32 {
    1.0
}

pub(crate) fn default_speech_rate() -> f32 {
    1.0
}

pub(crate) fn default_chunk_pause_ms() -> u64 {
    300
}

pub(crate) fn default_seek_step() -> usize {
    5
}

pub(crate) fn default_settle_delay_ms() -> u64 {
    150
}

pub(crate) fn default_backend_ready_timeout_ms() -> u64 {
    5000
}

pub(crate) fn default_backend_poll_interval_ms() -> u64 {
    100
}

pub(crate) fn default_piper_voices_dir() -> String {
    "/usr/share/piper-voices".to_string()
}

pub(crate) fn default_cache_dir() -> String {
    ".cache".to_string()
}
