//! Console and log file output.
//!
//! Both sinks share one line format, `YYYY-MM-DD HH:MM:SS | LEVEL | message`,
//! so the log file reads the same as the terminal.

use crate::constants::logging::{LOG_FILE_PREFIX, LOG_FILE_TIMESTAMP, LOG_LINE_TIMESTAMP};
use chrono::Local;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{Event, Subscriber, info, warn};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{self, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Event format shared by the console and file layers.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLineFormat;

impl<S, N> FormatEvent<S, N> for LogLineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        write!(
            writer,
            "{} | {} | ",
            Local::now().format(LOG_LINE_TIMESTAMP),
            event.metadata().level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Default log file name in the working directory, e.g. `inference_20240501_120000.log`.
pub fn default_log_path() -> PathBuf {
    PathBuf::from(format!(
        "{LOG_FILE_PREFIX}{}.log",
        Local::now().format(LOG_FILE_TIMESTAMP)
    ))
}

/// Console filter for the given verbosity.
///
/// ORT logging is suppressed by default because CUDA fallback is expected in auto mode.
fn console_filter(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "warn,ort=off";
    }
    match verbose {
        0 => "info,ort=off",
        1 => "debug,ort=warn",
        2 => "trace,ort=info",
        _ => "trace",
    }
}

/// Log file filter for the given verbosity.
fn file_filter(verbose: u8) -> &'static str {
    if verbose == 0 {
        "info,ort=off"
    } else {
        "debug,ort=warn"
    }
}

/// Install the global subscriber: console on stdout plus `log_path` when it can be created.
pub fn init_logging(log_path: &Path, verbose: u8, quiet: bool) {
    let console_env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_filter(verbose, quiet)));
    let console = fmt::layer()
        .event_format(LogLineFormat)
        .with_writer(std::io::stdout)
        .with_filter(console_env);

    let (file_layer, file_error) = match File::create(log_path) {
        Ok(file) => (
            Some(
                fmt::layer()
                    .event_format(LogLineFormat)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(EnvFilter::new(file_filter(verbose))),
            ),
            None,
        ),
        Err(e) => (None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .init();

    match file_error {
        None => info!("Logging to: {}", log_path.display()),
        Some(e) => warn!(
            "Could not create log file {}: {e}; logging to console only",
            log_path.display()
        ),
    }
}
