//! Session logging
//!
//! Lines go to a daily rolling `session.<date>.log` in the log directory and,
//! when enabled, to the console. The level comes from the configuration and
//! can change on every reload; lines on the `important` target are always
//! written.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Layer, Registry};

use crate::config::profile::LoggingOptions;
use crate::constants::{IMPORTANT_TARGET, LOG_FILE_PREFIX};

/// Logs on the target that bypasses the configured level.
#[macro_export]
macro_rules! important {
    ($($arg:tt)+) => {
        ::tracing::info!(target: $crate::constants::IMPORTANT_TARGET, $($arg)+)
    };
}

#[derive(Debug, Error)]
#[error("Invalid configuration: {0} is not a valid log level.")]
pub struct InvalidLogLevel(pub String);

/// Maps a configuration level name to a tracing directive.
pub fn level_directive(level: &str) -> Result<&'static str, InvalidLogLevel> {
    match level.to_ascii_lowercase().as_str() {
        "info" => Ok("info"),
        "warning" | "warn" => Ok("warn"),
        "error" => Ok("error"),
        _ => Err(InvalidLogLevel(level.to_string())),
    }
}

fn build_filter(directive: &str) -> EnvFilter {
    EnvFilter::new(format!("{},{}=info", directive, IMPORTANT_TARGET))
}

/// Handle to the installed subscriber. Dropping it flushes the file writer.
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    console: Arc<AtomicBool>,
    /// Level forced on the command line, wins over the configuration
    pinned_level: Option<&'static str>,
    _guard: WorkerGuard,
}

impl LogHandle {
    /// Applies the logging switches of a freshly loaded configuration.
    ///
    /// With logging off only errors and important lines are kept. An unknown
    /// level is reported and the previous filter stays in place.
    pub fn apply(&self, options: &LoggingOptions, console_flag: bool) {
        self.console.store(console_flag || options.console, Ordering::Relaxed);

        let directive = match (self.pinned_level, options.enabled, options.level.as_deref()) {
            (Some(pinned), _, _) => pinned,
            (None, false, _) => "error",
            (None, true, None) => "info",
            (None, true, Some(level)) => match level_directive(level) {
                Ok(directive) => directive,
                Err(error) => {
                    tracing::error!("{}", error);
                    return;
                }
            },
        };

        if let Err(error) = self.filter.reload(build_filter(directive)) {
            tracing::error!("Cannot change the log level: {}", error);
        }
    }
}

/// Installs the global subscriber.
///
/// # Arguments
/// * `log_dir` - Directory of the rolling session files, created if missing
/// * `console` - Mirror lines to stdout from the start
/// * `level` - Level forced from the command line
pub fn init(log_dir: &Path, console: bool, level: Option<&str>) -> Result<LogHandle> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("cannot create log directory {}", log_dir.display()))?;

    let pinned_level = level.map(level_directive).transpose()?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(log_dir)
        .context("cannot open session log")?;
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let (filter, filter_handle) = reload::Layer::new(build_filter(pinned_level.unwrap_or("info")));

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(false);

    let console_enabled = Arc::new(AtomicBool::new(console));
    let console_switch = Arc::clone(&console_enabled);
    let console_layer = fmt::layer()
        .with_target(false)
        .with_filter(filter_fn(move |_| console_switch.load(Ordering::Relaxed)));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("a global logger is already installed")?;

    Ok(LogHandle {
        filter: filter_handle,
        console: console_enabled,
        pinned_level,
        _guard: guard,
    })
}
