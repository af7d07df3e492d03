use super::models::AppConfig;
use super::tables::ConfigTables;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err}");
            AppConfig::default()
        }
    }
}

pub fn parse_config(contents: &str) -> Result<AppConfig, toml::de::Error> {
    toml::from_str::<ConfigTables>(contents).map(AppConfig::from)
}

pub fn serialize_config(config: &AppConfig) -> Result<String, toml::ser::Error> {
    toml::to_string(&ConfigTables::from(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendKind, LogLevel};

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(parse_config("").unwrap(), AppConfig::default());
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let cfg = parse_config(
            r#"
            [chunking]
            hard_max_chars = 900

            [playback]
            rate = 1.5

            [backend]
            kind = "piper"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.chunk_hard_max_chars, 900);
        assert_eq!(cfg.chunk_min_chars, 600);
        assert!((cfg.speech_rate - 1.5).abs() < f32::EPSILON);
        assert_eq!(cfg.chunk_pause_ms, 300);
        assert_eq!(cfg.backend, BackendKind::Piper);
    }

    #[test]
    fn invalid_log_level_is_an_error() {
        assert!(parse_config("[logging]\nlog_level = \"loud\"").is_err());
    }

    #[test]
    fn serialized_config_parses_back() {
        let mut cfg = AppConfig::default();
        cfg.log_level = LogLevel::Warn;
        cfg.smart_voices = false;
        cfg.male_voice_hints = vec!["bruce".to_string()];
        let text = serialize_config(&cfg).unwrap();
        assert_eq!(parse_config(&text).unwrap(), cfg);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = load_config(Path::new("/definitely/not/here/config.toml"));
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn oversized_thresholds_are_clamped_into_policy() {
        let cfg = parse_config("[chunking]\nmin_chars = 2000\nsoft_max_chars = 1800").unwrap();
        let policy = cfg.chunk_policy();
        assert_eq!(policy.soft_max_chars, 1500);
        assert_eq!(policy.min_chars, 1500);
    }
}
