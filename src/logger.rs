use std::io::{self, StderrLock};
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::{
    cursor, queue,
    terminal::{Clear, ClearType},
};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Log filter variable checked before `RUST_LOG`.
const LOG_ENV: &str = "VOLLEY_LOG";

/// Set while an unterminated progress line occupies the last stderr row.
static PROGRESS_LINE_ACTIVE: AtomicBool = AtomicBool::new(false);

pub(crate) fn set_progress_line_active(active: bool) {
    PROGRESS_LINE_ACTIVE.store(active, Ordering::Release);
}

#[must_use]
pub(crate) fn progress_line_active() -> bool {
    PROGRESS_LINE_ACTIVE.load(Ordering::Acquire)
}

/// Stderr writer that wipes a drawn progress line before a log record is
/// written; the next progress tick redraws it below the record.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LogWriter;

impl<'writer> MakeWriter<'writer> for LogWriter {
    type Writer = StderrLock<'static>;

    fn make_writer(&'writer self) -> Self::Writer {
        let mut out = io::stderr().lock();
        if progress_line_active() {
            let _cleared = queue!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine));
        }
        out
    }
}

pub fn init_logging(verbose: bool, no_color: bool) {
    let filter = std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .map_or_else(
            |_| {
                if verbose {
                    EnvFilter::new("debug")
                } else {
                    EnvFilter::new("info")
                }
            },
            |value| EnvFilter::try_new(value).unwrap_or_else(|_| EnvFilter::new("info")),
        );

    // stdout carries the report; logs go to stderr alongside the progress line.
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(!no_color)
        .with_writer(LogWriter)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set global default subscriber: {}", err);
    }
}
