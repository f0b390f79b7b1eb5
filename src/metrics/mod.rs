//! Outcome recording, aggregation and latency statistics.
mod aggregator;
pub mod latency;
mod types;


pub use aggregator::MetricsAggregator;
pub use latency::LatencyHistogram;
pub use types::{
    AggregateStats, ErrorKind, Exchange, LatencyStats, ProgressSnapshot, RequestOutcome,
    RunCompletion, rate_x100, ratio_x100,
};
