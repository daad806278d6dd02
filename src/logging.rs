//! Logging setup on tracing + tracing-subscriber
//!
//! Console output always goes to stderr so that replies printed on stdout
//! stay machine-readable. An optional rolling file layer is added when
//! `logging.file` is configured.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LoggingSettings;
use crate::error::{Error, Result};

const CRATE_TARGET: &str = "persona_engine";

/// HTTP stack crates, pinned to warn whatever the CLI level.
const QUIET_TARGETS: &[&str] = &["hyper", "reqwest", "rustls", "h2"];

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

/// Keeps the non-blocking file writer alive. Drop it last.
pub struct LogGuards {
    _file: Option<WorkerGuard>,
}

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Hourly,
    #[default]
    Daily,
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(r: LogRotation) -> Self {
        match r {
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Initialization
// ─────────────────────────────────────────────────────────────────

/// Initialize logging for the CLI. `-q` beats `-v`, `-v` beats the config.
pub fn init_logging(settings: &LoggingSettings, verbose: u8, quiet: bool) -> Result<LogGuards> {
    let level = effective_level(&settings.level, verbose, quiet);
    let filter = env_filter(level)?;

    let console = fmt_layer(io::stderr, settings.json_format, true);
    let (file, guard) = match settings.file.as_deref() {
        Some(path) => {
            let (writer, guard) = rolling_writer(Path::new(path), settings.rotation, settings.max_files)?;
            (Some(fmt_layer(writer, settings.json_format, false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))?;

    tracing::debug!(
        level = %level,
        file = ?settings.file,
        json = settings.json_format,
        "Logging initialized"
    );
    Ok(LogGuards { _file: guard })
}

/// Minimal stderr logging for commands that run before config is loaded.
pub fn init_simple(level: Level) -> Result<()> {
    let filter = env_filter(LevelFilter::from_level(level))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer(io::stderr, false, true))
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

/// Level name to filter; unknown names fall back to `info`.
pub fn parse_level(name: &str) -> LevelFilter {
    match name.trim().to_lowercase().as_str() {
        "warning" => LevelFilter::WARN,
        other => other.parse().unwrap_or(LevelFilter::INFO),
    }
}

fn effective_level(configured: &str, verbose: u8, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::ERROR,
        (false, 0) => parse_level(configured),
        (false, 1) => LevelFilter::DEBUG,
        (false, _) => LevelFilter::TRACE,
    }
}

/// RUST_LOG wins for everything it names; our crate follows the CLI level.
fn env_filter(level: LevelFilter) -> Result<EnvFilter> {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    filter = filter.add_directive(directive(&format!("{}={}", CRATE_TARGET, level))?);
    for target in QUIET_TARGETS {
        filter = filter.add_directive(directive(&format!("{}=warn", target))?);
    }
    Ok(filter)
}

fn directive(text: &str) -> Result<Directive> {
    text.parse()
        .map_err(|e| Error::Config(format!("Invalid log directive '{}': {}", text, e)))
}

// ─────────────────────────────────────────────────────────────────
// Layers
// ─────────────────────────────────────────────────────────────────

/// Formatting layer over any writer. Console gets colour, files never do.
fn fmt_layer<S, W>(writer: W, json: bool, console: bool) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    if json {
        Box::new(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_current_span(true)
                .with_thread_ids(!console),
        )
    } else if console {
        Box::new(fmt::layer().with_writer(writer).with_target(false).compact())
    } else {
        Box::new(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_thread_ids(true),
        )
    }
}

fn rolling_writer(
    path: &Path,
    rotation: LogRotation,
    max_files: u32,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let directory = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(directory).map_err(|e| Error::IoWrite {
        path: directory.to_path_buf(),
        source: e,
    })?;

    let prefix = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("persona-engine");
    let appender = RollingFileAppender::builder()
        .rotation(rotation.into())
        .filename_prefix(prefix)
        .filename_suffix("log")
        .max_log_files(max_files.max(1) as usize)
        .build(directory)
        .map_err(|e| Error::Config(format!("Failed to create log file appender: {}", e)))?;

    Ok(tracing_appender::non_blocking(appender))
}
