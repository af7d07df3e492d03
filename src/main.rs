//! `narrate`: read a plain-text file aloud from start to finish.
//!
//! - Parse command-line arguments.
//! - Load configuration from `conf/config.toml`.
//! - Start the configured speech backend and wait for it.
//! - Build the document and play it until the last chunk.

use anyhow::{Context, Result, anyhow};
use page_narrator::backend::{DryRunBackend, SpeechBackend};
use page_narrator::config::{AppConfig, BackendKind, load_config};
use page_narrator::keep_alive::LoggingKeepAlive;
use page_narrator::playback::ReaderCommand;
use page_narrator::reader::Reader;
use page_narrator::source::load_text_source;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let (text_path, start) = parse_args()?;
    let config = load_config(Path::new("conf/config.toml"));
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        path = %text_path.display(),
        backend = %config.backend,
        level = %config.log_level,
        "Starting narrator"
    );

    let backend = build_backend(&config)?;
    let mut reader = Reader::new(backend, &config).with_keep_alive(LoggingKeepAlive::default());
    reader
        .wait_for_backend(config.backend_ready_timeout(), config.backend_poll_interval())
        .context("Waiting for speech backend")?;

    let mut source = load_text_source(&text_path)?;
    reader.load(&mut source).context("Building document")?;
    if reader.progress().total == 0 {
        warn!("Nothing to read in {}", text_path.display());
        return Ok(());
    }
    if let Some(percent) = start {
        reader.command(ReaderCommand::Seek { percent })?;
    }
    reader.command(ReaderCommand::Play)?;
    reader.run_until_stopped();
    Ok(())
}

fn build_backend(config: &AppConfig) -> Result<Box<dyn SpeechBackend>> {
    match config.backend {
        BackendKind::DryRun => Ok(Box::new(DryRunBackend::default())),
        #[cfg(feature = "piper")]
        BackendKind::Piper => {
            let backend = page_narrator::backend::PiperBackend::new(
                &config.piper_voices_dir,
                config.cache_dir(),
            )?;
            Ok(Box::new(backend))
        }
        #[cfg(not(feature = "piper"))]
        BackendKind::Piper => Err(anyhow!(
            "Piper backend requested but this build lacks the `piper` feature"
        )),
    }
}

fn parse_args() -> Result<(PathBuf, Option<f64>)> {
    let mut args = env::args().skip(1);
    let path = args
        .next()
        .ok_or_else(|| anyhow!("Usage: narrate <path-to-text> [start-fraction]"))?;

    let path = PathBuf::from(path);
    if !path.exists() {
        return Err(anyhow!("File not found: {}", path.as_path().display()));
    }
    let start = args
        .next()
        .map(|raw| {
            raw.parse::<f64>()
                .with_context(|| format!("Invalid start fraction: {raw}"))
        })
        .transpose()?;
    Ok((path, start))
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    warn!("Logging initialized; override level with config.log_level or RUST_LOG");
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("debug"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}
