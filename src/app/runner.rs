use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use tokio::time::Instant;

use crate::args::TesterArgs;
use crate::domain::TestConfiguration;
use crate::error::{AppError, AppResult};
use crate::http::{self, HttpTransport, RequestExecutor, Transport};
use crate::metrics::{AggregateStats, MetricsAggregator};
use crate::scheduler::Scheduler;
use crate::shutdown_handlers::{setup_signal_shutdown_handler, shutdown_channel};

use super::export::{self, SummaryDocument};
use super::progress::{ProgressReporter, progress_enabled};
use super::summary;

/// Console and file outputs of a run.
#[derive(Debug, Clone, Default)]
pub(crate) struct OutputOptions {
    pub(crate) csv: Option<PathBuf>,
    pub(crate) json: Option<PathBuf>,
    pub(crate) progress: bool,
    pub(crate) no_color: bool,
}

impl OutputOptions {
    pub(crate) fn from_args(args: &TesterArgs) -> Self {
        Self {
            csv: args.csv.as_ref().map(PathBuf::from),
            json: args.json.as_ref().map(PathBuf::from),
            progress: progress_enabled(args.no_progress, args.verbose),
            no_color: args.no_color,
        }
    }
}

pub(crate) async fn run_local(config: TestConfiguration, output: &OutputOptions) -> AppResult<()> {
    let config = Arc::new(config);
    summary::print_banner(&config);

    let client = http::build_client(&config)?;
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(client, &config));
    let stats = execute_run(Arc::clone(&config), transport, output).await?;

    summary::print_report(&stats);
    write_exports(&config, &stats, output).await
}

/// Runs the scheduler with signal handling and the optional progress line.
pub(crate) async fn execute_run(
    config: Arc<TestConfiguration>,
    transport: Arc<dyn Transport>,
    output: &OutputOptions,
) -> AppResult<AggregateStats> {
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);

    let run_start = Instant::now();
    let in_flight = Arc::new(AtomicU64::new(0));
    let aggregator = Arc::new(MetricsAggregator::new(
        config.total_requests.get(),
        config.retain_outcomes,
    ));
    let executor = RequestExecutor::new(
        transport,
        config.request_timeout,
        run_start,
        Arc::clone(&in_flight),
    );

    let progress = output.progress.then(|| {
        ProgressReporter::new(
            Arc::clone(&aggregator),
            in_flight,
            config.total_requests.get(),
            run_start,
        )
        .spawn(output.no_color)
    });

    tracing::debug!("Starting run against {}", config.url);
    let result = Scheduler::new(config, executor, aggregator)
        .run(shutdown_rx)
        .await;

    if let Some(progress) = progress {
        progress.finish().await;
    }
    signal_handle.abort();

    result
}

async fn write_exports(
    config: &TestConfiguration,
    stats: &AggregateStats,
    output: &OutputOptions,
) -> AppResult<()> {
    let mut failure = None;

    if let Some(path) = output.csv.as_ref() {
        match export::export_csv(path, &stats.outcomes).await {
            Ok(()) => println!("Detailed results saved to: {}", path.display()),
            Err(err) => {
                tracing::error!("{}", err);
                failure = failure.or(Some(err));
            }
        }
    }

    if let Some(path) = output.json.as_ref() {
        let document = SummaryDocument::new(config, stats);
        match export::export_json(path, &document).await {
            Ok(()) => println!("Summary statistics saved to: {}", path.display()),
            Err(err) => {
                tracing::error!("{}", err);
                failure = failure.or(Some(err));
            }
        }
    }

    failure.map_or(Ok(()), |err| Err(AppError::export(err)))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::tempdir;
    use url::Url;

    use super::*;
    use crate::args::{PositiveU64, PositiveUsize};
    use crate::metrics::Exchange;

    struct EchoTransport;

    #[async_trait]
    impl Transport for EchoTransport {
        async fn exchange(&self) -> Exchange {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Exchange::Response {
                status: 200,
                bytes: 4,
            }
        }
    }

    fn run_async_test<F>(future: F) -> AppResult<()>
    where
        F: std::future::Future<Output = AppResult<()>>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| AppError::validation(format!("Failed to build runtime: {}", err)))?;
        runtime.block_on(future)
    }

    fn test_config() -> AppResult<TestConfiguration> {
        let url = Url::parse("http://loadtest.invalid/")
            .map_err(|err| AppError::validation(format!("bad url: {}", err)))?;
        let mut config =
            TestConfiguration::new(url, PositiveU64::try_from(6)?, PositiveUsize::try_from(2)?);
        config.retain_outcomes = true;
        Ok(config)
    }

    #[test]
    fn run_then_export_writes_both_files() -> AppResult<()> {
        run_async_test(async {
            let dir = tempdir()?;
            let output = OutputOptions {
                csv: Some(dir.path().join("out.csv")),
                json: Some(dir.path().join("out.json")),
                progress: false,
                no_color: true,
            };
            let config = Arc::new(test_config()?);
            let stats = execute_run(Arc::clone(&config), Arc::new(EchoTransport), &output).await?;
            if stats.issued != 6 || stats.outcomes.len() != 6 {
                return Err(AppError::validation("expected six outcomes"));
            }

            write_exports(&config, &stats, &output).await?;
            let csv = std::fs::read_to_string(dir.path().join("out.csv"))?;
            if csv.lines().count() != 7 {
                return Err(AppError::validation("csv should have header plus six rows"));
            }
            let summary = export::import_summary(&dir.path().join("out.json"))?;
            if summary.stats.successful_requests != 6 || summary.stats.total_bytes != 24 {
                return Err(AppError::validation("unexpected imported summary"));
            }
            Ok(())
        })
    }

    #[test]
    fn export_failure_is_reported() -> AppResult<()> {
        run_async_test(async {
            let dir = tempdir()?;
            let output = OutputOptions {
                json: Some(dir.path().join("missing").join("out.json")),
                ..OutputOptions::default()
            };
            let config = Arc::new(test_config()?);
            let stats = execute_run(Arc::clone(&config), Arc::new(EchoTransport), &output).await?;
            if !matches!(
                write_exports(&config, &stats, &output).await,
                Err(AppError::Export(_))
            ) {
                return Err(AppError::validation("expected export error"));
            }
            Ok(())
        })
    }
}
