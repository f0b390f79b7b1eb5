use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::MetricsError;

use super::latency::{duration_micros, summarize};
use super::types::{AggregateStats, ErrorKind, RequestOutcome, RunCompletion};

/// Shared sink for request outcomes.
///
/// The success/failure/byte counters are plain atomics so progress sampling
/// never contends with recording. Everything else lives behind a mutex that
/// is only held for the duration of a single `record` call.
#[derive(Debug)]
pub struct MetricsAggregator {
    succeeded: AtomicU64,
    failed: AtomicU64,
    bytes: AtomicU64,
    retain_outcomes: bool,
    state: Mutex<AggregatorState>,
}

#[derive(Debug, Default)]
struct AggregatorState {
    finalized: bool,
    status_counts: BTreeMap<u16, u64>,
    error_counts: BTreeMap<ErrorKind, u64>,
    latencies_micros: Vec<u64>,
    outcomes: Vec<RequestOutcome>,
}

impl MetricsAggregator {
    #[must_use]
    pub fn new(expected: u64, retain_outcomes: bool) -> Self {
        let capacity = usize::try_from(expected).unwrap_or(0);
        let state = AggregatorState {
            latencies_micros: Vec::with_capacity(capacity),
            outcomes: if retain_outcomes {
                Vec::with_capacity(capacity)
            } else {
                Vec::new()
            },
            ..AggregatorState::default()
        };
        Self {
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            retain_outcomes,
            state: Mutex::new(state),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, AggregatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Folds one outcome into the running totals.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Finalized`] once `finalize` has been called.
    pub fn record(&self, outcome: RequestOutcome) -> Result<(), MetricsError> {
        {
            let mut state = self.lock_state();
            if state.finalized {
                return Err(MetricsError::Finalized);
            }
            match outcome.error_kind() {
                Some(kind) => {
                    let count = state.error_counts.entry(kind).or_insert(0);
                    *count = count.saturating_add(1);
                }
                None => {
                    if let Some(status) = outcome.status() {
                        let count = state.status_counts.entry(status).or_insert(0);
                        *count = count.saturating_add(1);
                    }
                }
            }
            state.latencies_micros.push(duration_micros(outcome.latency));
            if self.retain_outcomes {
                state.outcomes.push(outcome);
            }
        }

        self.bytes.fetch_add(outcome.bytes(), Ordering::Relaxed);
        if outcome.is_failure() {
            self.failed.fetch_add(1, Ordering::Release);
        } else {
            self.succeeded.fetch_add(1, Ordering::Release);
        }
        Ok(())
    }

    #[must_use]
    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Acquire)
    }

    /// Requests whose outcome has been committed.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.succeeded().saturating_add(self.failed())
    }

    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Sorts the latency buffer and produces the final statistics.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Finalized`] when called more than once.
    pub fn finalize(&self, completion: RunCompletion) -> Result<AggregateStats, MetricsError> {
        let (status_counts, error_counts, latencies, mut outcomes) = {
            let mut state = self.lock_state();
            if state.finalized {
                return Err(MetricsError::Finalized);
            }
            state.finalized = true;
            (
                std::mem::take(&mut state.status_counts),
                std::mem::take(&mut state.error_counts),
                std::mem::take(&mut state.latencies_micros),
                std::mem::take(&mut state.outcomes),
            )
        };
        outcomes.sort_unstable_by_key(|outcome| outcome.sequence);

        let succeeded = self.succeeded();
        let failed = self.failed();
        Ok(AggregateStats {
            issued: succeeded.saturating_add(failed),
            succeeded,
            failed,
            status_counts,
            error_counts,
            total_bytes: self.total_bytes(),
            started_at: completion.started_at,
            finished_at: completion.finished_at,
            duration: completion.duration,
            batches: completion.batches,
            cancelled: completion.cancelled,
            abandoned: completion.abandoned,
            latency: summarize(latencies),
            outcomes,
        })
    }
}
