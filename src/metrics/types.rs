use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::latency::LatencyHistogram;

/// Transport-level failure categories. HTTP error statuses are not failures
/// of this kind; they complete as a [`Exchange::Response`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "timeout")]
    Timeout,
    #[serde(rename = "connection_refused")]
    ConnectionRefused,
    #[serde(rename = "connection_reset")]
    ConnectionReset,
    #[serde(rename = "tls_error")]
    Tls,
    #[serde(rename = "transport_error")]
    Transport,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::Timeout,
        ErrorKind::ConnectionRefused,
        ErrorKind::ConnectionReset,
        ErrorKind::Tls,
        ErrorKind::Transport,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::ConnectionRefused => "connection_refused",
            ErrorKind::ConnectionReset => "connection_reset",
            ErrorKind::Tls => "tls_error",
            ErrorKind::Transport => "transport_error",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "Request timed out",
            ErrorKind::ConnectionRefused => "Connection refused",
            ErrorKind::ConnectionReset => "Connection reset by peer",
            ErrorKind::Tls => "TLS handshake or certificate failure",
            ErrorKind::Transport => "Other transport error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    /// A full HTTP response was received and its body drained.
    Response { status: u16, bytes: u64 },
    Failure(ErrorKind),
}

/// Immutable record of one request attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOutcome {
    /// 0-based issue order.
    pub sequence: u64,
    /// Monotonic offset of the issue instant from run start.
    pub offset: Duration,
    pub issued_at: DateTime<Utc>,
    pub latency: Duration,
    pub exchange: Exchange,
}

impl RequestOutcome {
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self.exchange {
            Exchange::Response { status, .. } => Some(status),
            Exchange::Failure(_) => None,
        }
    }

    #[must_use]
    pub const fn bytes(&self) -> u64 {
        match self.exchange {
            Exchange::Response { bytes, .. } => bytes,
            Exchange::Failure(_) => 0,
        }
    }

    #[must_use]
    pub const fn error_kind(&self) -> Option<ErrorKind> {
        match self.exchange {
            Exchange::Response { .. } => None,
            Exchange::Failure(kind) => Some(kind),
        }
    }

    #[must_use]
    pub const fn is_failure(&self) -> bool {
        match self.exchange {
            Exchange::Response { status, .. } => status >= 400,
            Exchange::Failure(_) => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatencyStats {
    pub count: u64,
    pub min: Duration,
    pub max: Duration,
    pub mean: Duration,
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub histogram: LatencyHistogram,
}

/// Run-level facts only the scheduler knows; folded into the final stats.
#[derive(Debug, Clone, Copy)]
pub struct RunCompletion {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration: Duration,
    pub batches: u64,
    pub cancelled: bool,
    pub abandoned: u64,
}

#[derive(Debug, Clone)]
pub struct AggregateStats {
    pub issued: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub status_counts: BTreeMap<u16, u64>,
    pub error_counts: BTreeMap<ErrorKind, u64>,
    pub total_bytes: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration: Duration,
    pub batches: u64,
    pub cancelled: bool,
    pub abandoned: u64,
    pub latency: LatencyStats,
    /// Sorted by sequence; empty unless retention was requested.
    pub outcomes: Vec<RequestOutcome>,
}

impl AggregateStats {
    /// Throughput as requests per second scaled by 100.
    #[must_use]
    pub fn requests_per_second_x100(&self) -> u64 {
        rate_x100(self.issued, self.duration)
    }

    #[must_use]
    pub fn success_rate_x100(&self) -> u64 {
        ratio_x100(self.succeeded, self.issued)
    }

    #[must_use]
    pub fn failure_rate_x100(&self) -> u64 {
        ratio_x100(self.failed, self.issued)
    }

    #[must_use]
    pub fn transport_errors(&self) -> u64 {
        self.error_counts
            .values()
            .fold(0u64, |acc, count| acc.saturating_add(*count))
    }
}

/// Live view of a running test, read from committed counters only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub completed: u64,
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub in_flight: u64,
    pub elapsed: Duration,
    pub rps_x100: u64,
}

impl ProgressSnapshot {
    #[must_use]
    pub fn percent_x100(&self) -> u64 {
        ratio_x100(self.completed, self.total).min(10_000)
    }
}

/// `count / elapsed` scaled by 100; zero when no time has elapsed.
#[must_use]
pub fn rate_x100(count: u64, elapsed: Duration) -> u64 {
    let micros = elapsed.as_micros();
    if micros == 0 {
        return 0;
    }
    let scaled = u128::from(count)
        .saturating_mul(100)
        .saturating_mul(1_000_000)
        .checked_div(micros)
        .unwrap_or(0);
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// `part / whole` as a percentage scaled by 100.
#[must_use]
pub fn ratio_x100(part: u64, whole: u64) -> u64 {
    if whole == 0 {
        return 0;
    }
    let scaled = u128::from(part)
        .saturating_mul(10_000)
        .checked_div(u128::from(whole))
        .unwrap_or(0);
    u64::try_from(scaled).unwrap_or(u64::MAX)
}
