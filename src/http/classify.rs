use std::error::Error as StdError;
use std::io;

use crate::metrics::ErrorKind;

/// Maps a reqwest failure onto the coarse categories used in reports.
///
/// Typed information (timeouts, `io::ErrorKind` anywhere in the source chain)
/// is preferred; message sniffing is the fallback for errors hyper and the
/// TLS backend only expose as text.
#[must_use]
pub fn classify_error(err: &reqwest::Error) -> ErrorKind {
    if err.is_timeout() {
        return ErrorKind::Timeout;
    }

    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(inner) = source {
        if let Some(io_err) = inner.downcast_ref::<io::Error>()
            && let Some(kind) = classify_io_kind(io_err.kind())
        {
            return kind;
        }
        source = inner.source();
    }

    classify_message(&error_chain_text(err))
}

#[must_use]
pub fn classify_io_kind(kind: io::ErrorKind) -> Option<ErrorKind> {
    if kind == io::ErrorKind::ConnectionRefused {
        return Some(ErrorKind::ConnectionRefused);
    }
    if matches!(
        kind,
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted | io::ErrorKind::BrokenPipe
    ) {
        return Some(ErrorKind::ConnectionReset);
    }
    if kind == io::ErrorKind::TimedOut {
        return Some(ErrorKind::Timeout);
    }
    None
}

pub(crate) fn classify_message(text: &str) -> ErrorKind {
    let message = text.to_ascii_lowercase();
    if message.contains("tls") || message.contains("ssl") || message.contains("certificate") {
        return ErrorKind::Tls;
    }
    if message.contains("connection refused") {
        return ErrorKind::ConnectionRefused;
    }
    if message.contains("connection reset")
        || message.contains("connection closed")
        || message.contains("broken pipe")
    {
        return ErrorKind::ConnectionReset;
    }
    if message.contains("timed out") {
        return ErrorKind::Timeout;
    }
    ErrorKind::Transport
}

/// Joins the messages of the source chain. The top-level reqwest message is
/// skipped since it embeds the request URL.
fn error_chain_text(err: &reqwest::Error) -> String {
    let mut parts = Vec::new();
    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(inner) = source {
        parts.push(inner.to_string());
        source = inner.source();
    }
    parts.join(": ")
}
