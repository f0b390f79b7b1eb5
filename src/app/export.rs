use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::args::HttpMethod;
use crate::domain::TestConfiguration;
use crate::error::ExportError;
use crate::metrics::{AggregateStats, ErrorKind, LatencyHistogram, RequestOutcome};

const CSV_HEADER: &[u8] = b"sequence,timestamp,latency_ms,status_code,error,bytes\n";

/// Top-level layout of the JSON summary file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryDocument {
    pub config: ConfigDocument,
    pub stats: StatsDocument,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub url: String,
    pub total_requests: u64,
    pub concurrency: usize,
    pub method: HttpMethod,
    pub timeout_s: f64,
    pub batch_size: u64,
    pub cooldown_s: f64,
    pub keep_alive: bool,
    pub verify_tls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsDocument {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub requests_per_second: f64,
    pub latency_ms: LatencyDocument,
    pub latency_distribution: LatencyHistogram,
    pub status_codes: BTreeMap<u16, u64>,
    pub errors: BTreeMap<ErrorKind, u64>,
    pub total_bytes: u64,
    pub total_duration_s: f64,
    pub batches: u64,
    pub cancelled: bool,
    pub abandoned: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LatencyDocument {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

impl SummaryDocument {
    #[must_use]
    pub fn new(config: &TestConfiguration, stats: &AggregateStats) -> Self {
        let latency = &stats.latency;
        Self {
            config: ConfigDocument {
                url: config.url.to_string(),
                total_requests: config.total_requests.get(),
                concurrency: config.concurrency.get(),
                method: config.method,
                timeout_s: config.request_timeout.as_secs_f64(),
                batch_size: config.effective_batch_size(),
                cooldown_s: config.cooldown.as_secs_f64(),
                keep_alive: config.keep_alive,
                verify_tls: config.verify_tls,
            },
            stats: StatsDocument {
                total_requests: stats.issued,
                successful_requests: stats.succeeded,
                failed_requests: stats.failed,
                requests_per_second: fixed_to_f64(stats.requests_per_second_x100(), 100),
                latency_ms: LatencyDocument {
                    min: millis_f64(latency.min),
                    max: millis_f64(latency.max),
                    mean: millis_f64(latency.mean),
                    p50: millis_f64(latency.p50),
                    p95: millis_f64(latency.p95),
                    p99: millis_f64(latency.p99),
                },
                latency_distribution: latency.histogram.clone(),
                status_codes: stats.status_counts.clone(),
                errors: stats.error_counts.clone(),
                total_bytes: stats.total_bytes,
                total_duration_s: stats.duration.as_secs_f64(),
                batches: stats.batches,
                cancelled: stats.cancelled,
                abandoned: stats.abandoned,
                started_at: stats.started_at,
                finished_at: stats.finished_at,
            },
            generated_at: Utc::now(),
        }
    }
}

#[expect(clippy::float_arithmetic, reason = "JSON output reports fractional values")]
fn fixed_to_f64(value: u64, scale: u64) -> f64 {
    value as f64 / scale as f64
}

fn millis_f64(duration: Duration) -> f64 {
    fixed_to_f64(u64::try_from(duration.as_micros()).unwrap_or(u64::MAX), 1_000)
}

fn csv_row(outcome: &RequestOutcome) -> String {
    let micros = outcome.latency.as_micros();
    let status = outcome
        .status()
        .map_or_else(String::new, |status| status.to_string());
    let error = outcome.error_kind().map_or("none", ErrorKind::as_str);
    format!(
        "{},{},{}.{:03},{},{},{}\n",
        outcome.sequence,
        outcome
            .issued_at
            .to_rfc3339_opts(SecondsFormat::Micros, true),
        micros / 1_000,
        micros % 1_000,
        status,
        error,
        outcome.bytes()
    )
}

/// Writes one CSV row per retained outcome, in sequence order.
///
/// # Errors
///
/// Returns an error when the file cannot be created or written.
pub(crate) async fn export_csv(path: &Path, outcomes: &[RequestOutcome]) -> Result<(), ExportError> {
    let write_error = |err: std::io::Error| ExportError::WriteCsv {
        path: path.to_path_buf(),
        source: err,
    };
    let file = tokio::fs::File::create(path).await.map_err(write_error)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(CSV_HEADER).await.map_err(write_error)?;
    for outcome in outcomes {
        writer
            .write_all(csv_row(outcome).as_bytes())
            .await
            .map_err(write_error)?;
    }
    writer.flush().await.map_err(write_error)?;
    Ok(())
}

/// Writes the pretty-printed JSON summary.
///
/// # Errors
///
/// Returns an error when serialization or the write fails.
pub(crate) async fn export_json(path: &Path, document: &SummaryDocument) -> Result<(), ExportError> {
    let json = serde_json::to_vec_pretty(document)
        .map_err(|err| ExportError::SerializeJson { source: err })?;
    let write_error = |err: std::io::Error| ExportError::WriteJson {
        path: path.to_path_buf(),
        source: err,
    };
    let file = tokio::fs::File::create(path).await.map_err(write_error)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&json).await.map_err(write_error)?;
    writer.write_all(b"\n").await.map_err(write_error)?;
    writer.flush().await.map_err(write_error)?;
    Ok(())
}

/// Reads a JSON summary written by [`export_json`].
///
/// # Errors
///
/// Returns an error when the file cannot be read or is not a summary.
pub fn import_summary(path: &Path) -> Result<SummaryDocument, ExportError> {
    let content = std::fs::read_to_string(path).map_err(|err| ExportError::ReadJson {
        path: PathBuf::from(path),
        source: err,
    })?;
    serde_json::from_str(&content).map_err(|err| ExportError::ParseJson {
        path: PathBuf::from(path),
        source: err,
    })
}

#[cfg(test)]
mod tests {
    use std::future::Future;

    use tempfile::tempdir;
    use url::Url;

    use super::*;
    use crate::args::{PositiveU64, PositiveUsize};
    use crate::error::{AppError, AppResult};
    use crate::metrics::{Exchange, MetricsAggregator, RunCompletion};

    fn run_async_test<F>(future: F) -> AppResult<()>
    where
        F: Future<Output = AppResult<()>>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| AppError::export(format!("Failed to build runtime: {}", err)))?;
        runtime.block_on(future)
    }

    fn sample_run() -> AppResult<(TestConfiguration, AggregateStats)> {
        let url = Url::parse("http://localhost:8080/api")
            .map_err(|err| AppError::export(format!("bad url: {}", err)))?;
        let mut config =
            TestConfiguration::new(url, PositiveU64::try_from(4)?, PositiveUsize::try_from(2)?);
        config.retain_outcomes = true;

        let aggregator = MetricsAggregator::new(4, true);
        let issued_at = DateTime::parse_from_rfc3339("2026-03-01T12:00:00.123456Z")
            .map_err(|err| AppError::export(format!("bad timestamp: {}", err)))?
            .with_timezone(&Utc);
        let exchanges = [
            Exchange::Response { status: 200, bytes: 12 },
            Exchange::Failure(ErrorKind::ConnectionRefused),
            Exchange::Response { status: 500, bytes: 3 },
            Exchange::Response { status: 200, bytes: 12 },
        ];
        for (sequence, exchange) in (0u64..).zip(exchanges) {
            aggregator.record(RequestOutcome {
                sequence,
                offset: Duration::from_millis(sequence),
                issued_at,
                latency: Duration::from_micros(sequence.saturating_mul(1_000).saturating_add(1_234)),
                exchange,
            })?;
        }
        let stats = aggregator.finalize(RunCompletion {
            started_at: issued_at,
            finished_at: issued_at,
            duration: Duration::from_secs(1),
            batches: 1,
            cancelled: false,
            abandoned: 0,
        })?;
        Ok((config, stats))
    }

    #[test]
    fn csv_rows_follow_header_layout() -> AppResult<()> {
        run_async_test(async {
            let (_config, stats) = sample_run()?;
            let dir = tempdir()?;
            let path = dir.path().join("results.csv");
            export_csv(&path, &stats.outcomes).await?;

            let content = std::fs::read_to_string(&path)?;
            let lines: Vec<&str> = content.lines().collect();
            let expected = [
                "sequence,timestamp,latency_ms,status_code,error,bytes",
                "0,2026-03-01T12:00:00.123456Z,1.234,200,none,12",
                "1,2026-03-01T12:00:00.123456Z,2.234,,connection_refused,0",
                "2,2026-03-01T12:00:00.123456Z,3.234,500,none,3",
                "3,2026-03-01T12:00:00.123456Z,4.234,200,none,12",
            ];
            if lines != expected {
                return Err(AppError::export(format!("unexpected csv: {:?}", lines)));
            }
            Ok(())
        })
    }

    #[test]
    fn json_summary_round_trips_counts() -> AppResult<()> {
        run_async_test(async {
            let (config, stats) = sample_run()?;
            let dir = tempdir()?;
            let path = dir.path().join("summary.json");
            export_json(&path, &SummaryDocument::new(&config, &stats)).await?;

            let document = import_summary(&path)?;
            let imported = &document.stats;
            if imported.total_requests != 4
                || imported.successful_requests != 2
                || imported.failed_requests != 2
            {
                return Err(AppError::export("unexpected request counts"));
            }
            if imported.status_codes != stats.status_counts || imported.errors != stats.error_counts {
                return Err(AppError::export("status/error maps changed"));
            }
            if imported.latency_distribution != stats.latency.histogram {
                return Err(AppError::export("histogram changed"));
            }
            if imported.total_bytes != 27 || document.config.total_requests != 4 {
                return Err(AppError::export("unexpected totals"));
            }
            if document.config.method != HttpMethod::Get {
                return Err(AppError::export("unexpected method"));
            }
            Ok(())
        })
    }

    #[test]
    fn json_summary_uses_stable_field_names() -> AppResult<()> {
        let (config, stats) = sample_run()?;
        let value = serde_json::to_value(SummaryDocument::new(&config, &stats))?;
        let stats_value = value
            .get("stats")
            .ok_or_else(|| AppError::export("missing stats"))?;
        for field in [
            "total_requests",
            "successful_requests",
            "failed_requests",
            "requests_per_second",
            "latency_ms",
            "latency_distribution",
            "status_codes",
            "errors",
            "total_bytes",
            "total_duration_s",
        ] {
            if stats_value.get(field).is_none() {
                return Err(AppError::export(format!("missing field {}", field)));
            }
        }
        let p50 = stats_value
            .get("latency_ms")
            .and_then(|latency| latency.get("p50"))
            .and_then(serde_json::Value::as_f64)
            .ok_or_else(|| AppError::export("missing p50"))?;
        if !(2.0..2.5).contains(&p50) {
            return Err(AppError::export(format!("unexpected p50 {}", p50)));
        }
        let refused = stats_value
            .get("errors")
            .and_then(|errors| errors.get("connection_refused"))
            .and_then(serde_json::Value::as_u64);
        if refused != Some(1) || value.get("generated_at").is_none() {
            return Err(AppError::export("unexpected errors/generated_at"));
        }
        Ok(())
    }

    #[test]
    fn import_rejects_non_summary_json() -> AppResult<()> {
        let dir = tempdir()?;
        let path = dir.path().join("other.json");
        std::fs::write(&path, "{\"hello\": 1}")?;
        if !matches!(import_summary(&path), Err(ExportError::ParseJson { .. })) {
            return Err(AppError::export("expected parse error"));
        }
        Ok(())
    }
}
