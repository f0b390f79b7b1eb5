use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;

use crate::domain::TestConfiguration;
use crate::error::{AppResult, MetricsError};
use crate::http::RequestExecutor;
use crate::metrics::{AggregateStats, MetricsAggregator, RunCompletion};
use crate::shutdown::{ShutdownReceiver, wait_for_shutdown};

use super::plan::{Batch, BatchPlan};

type RequestTasks = JoinSet<Result<(), MetricsError>>;

/// Drives a run: batches, the concurrency gate, cooldowns and cancellation.
pub struct Scheduler {
    config: Arc<TestConfiguration>,
    executor: RequestExecutor,
    aggregator: Arc<MetricsAggregator>,
}

enum BatchEnd {
    Completed,
    Cancelled,
}

impl Scheduler {
    #[must_use]
    pub const fn new(
        config: Arc<TestConfiguration>,
        executor: RequestExecutor,
        aggregator: Arc<MetricsAggregator>,
    ) -> Self {
        Self {
            config,
            executor,
            aggregator,
        }
    }

    /// Runs every batch to completion (or until shutdown) and finalizes the
    /// aggregator.
    ///
    /// # Errors
    ///
    /// Returns an error if the aggregator was already finalized.
    pub async fn run(self, mut shutdown_rx: ShutdownReceiver) -> AppResult<AggregateStats> {
        let plan = BatchPlan::new(self.config.total_requests, self.config.batch_size);
        let gate = Arc::new(Semaphore::new(self.config.effective_concurrency()));
        let mut tasks = RequestTasks::new();

        let started_at = Utc::now();
        let start = Instant::now();
        let mut batches_completed: u64 = 0;
        let mut cancelled = false;

        tracing::debug!(
            "Planned {} batch(es) of up to {} request(s), concurrency {}",
            plan.batch_count(),
            plan.batch_size(),
            self.config.effective_concurrency()
        );

        for batch in plan.batches() {
            if batch.index > 0 && !self.config.cooldown.is_zero() {
                tracing::info!(
                    "Cooling down for {:?} before batch {}/{}",
                    self.config.cooldown,
                    batch.index.saturating_add(1),
                    plan.batch_count()
                );
                tokio::select! {
                    biased;
                    () = wait_for_shutdown(&mut shutdown_rx) => {
                        cancelled = true;
                        break;
                    }
                    () = tokio::time::sleep(self.config.cooldown) => {}
                }
            }

            if plan.batch_count() > 1 {
                tracing::info!(
                    "Batch {}/{}: requests {}-{}",
                    batch.index.saturating_add(1),
                    plan.batch_count(),
                    batch.start.saturating_add(1),
                    batch.end
                );
            }

            match self
                .run_batch(batch, &gate, &mut tasks, &mut shutdown_rx)
                .await
            {
                BatchEnd::Completed => {
                    batches_completed = batches_completed.saturating_add(1);
                }
                BatchEnd::Cancelled => {
                    cancelled = true;
                    break;
                }
            }
        }

        let abandoned = if cancelled {
            tracing::warn!(
                "Run cancelled; draining {} in-flight request(s) for up to {:?}",
                tasks.len(),
                self.config.grace_period
            );
            drain_with_grace(&mut tasks, self.config.grace_period).await
        } else {
            0
        };
        if abandoned > 0 {
            tracing::warn!("Abandoned {} request(s) after the grace period", abandoned);
        }

        let completion = RunCompletion {
            started_at,
            finished_at: Utc::now(),
            duration: start.elapsed(),
            batches: batches_completed,
            cancelled,
            abandoned,
        };
        Ok(self.aggregator.finalize(completion)?)
    }

    async fn run_batch(
        &self,
        batch: Batch,
        gate: &Arc<Semaphore>,
        tasks: &mut RequestTasks,
        shutdown_rx: &mut ShutdownReceiver,
    ) -> BatchEnd {
        for sequence in batch.sequences() {
            let permit = tokio::select! {
                biased;
                () = wait_for_shutdown(shutdown_rx) => return BatchEnd::Cancelled,
                permit = Arc::clone(gate).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_closed) => return BatchEnd::Cancelled,
                },
            };

            let executor = self.executor.clone();
            let aggregator = Arc::clone(&self.aggregator);
            tasks.spawn(async move {
                let outcome = executor.execute(sequence).await;
                let recorded = aggregator.record(outcome);
                drop(permit);
                recorded
            });

            while let Some(result) = tasks.try_join_next() {
                log_task_result(result);
            }
        }

        tokio::select! {
            biased;
            () = wait_for_shutdown(shutdown_rx) => BatchEnd::Cancelled,
            () = drain_all(tasks) => BatchEnd::Completed,
        }
    }
}

async fn drain_all(tasks: &mut RequestTasks) {
    while let Some(result) = tasks.join_next().await {
        log_task_result(result);
    }
}

/// Waits up to `grace` for in-flight requests, then aborts the rest.
/// Returns how many were aborted before recording an outcome.
async fn drain_with_grace(tasks: &mut RequestTasks, grace: Duration) -> u64 {
    if tokio::time::timeout(grace, drain_all(tasks)).await.is_ok() {
        return 0;
    }

    tasks.abort_all();
    let mut abandoned: u64 = 0;
    while let Some(result) = tasks.join_next().await {
        match result {
            Err(err) if err.is_cancelled() => abandoned = abandoned.saturating_add(1),
            Err(err) => log_task_result(Err(err)),
            Ok(recorded) => log_task_result(Ok(recorded)),
        }
    }
    abandoned
}

fn log_task_result(result: Result<Result<(), MetricsError>, JoinError>) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!("Dropped request outcome: {}", err),
        Err(err) => tracing::error!("Request task failed: {}", err),
    }
}
