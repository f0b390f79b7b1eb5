//! Latency buckets and exact, sort-based percentiles.
use std::collections::BTreeMap;
use std::time::Duration;

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use super::types::LatencyStats;

pub const BUCKET_COUNT: usize = 8;

/// Bucket labels paired with their exclusive upper bound in microseconds.
/// The lower bound of each bucket is inclusive.
const BUCKETS: [(&str, u64); BUCKET_COUNT] = [
    ("<10ms", 10_000),
    ("10-50ms", 50_000),
    ("50-100ms", 100_000),
    ("100-200ms", 200_000),
    ("200-500ms", 500_000),
    ("500ms-1s", 1_000_000),
    ("1-2s", 2_000_000),
    (">2s", u64::MAX),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatencyHistogram {
    counts: [u64; BUCKET_COUNT],
}

impl LatencyHistogram {
    pub fn record(&mut self, micros: u64) {
        let index = BUCKETS
            .iter()
            .position(|(_, upper)| micros < *upper)
            .unwrap_or(BUCKET_COUNT.saturating_sub(1));
        if let Some(count) = self.counts.get_mut(index) {
            *count = count.saturating_add(1);
        }
    }

    /// Sets a bucket count by label; unknown labels are ignored.
    pub fn set(&mut self, label: &str, value: u64) {
        if let Some(index) = BUCKETS.iter().position(|(name, _)| *name == label)
            && let Some(count) = self.counts.get_mut(index)
        {
            *count = value;
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts
            .iter()
            .fold(0u64, |acc, count| acc.saturating_add(*count))
    }

    /// Buckets in ascending order, including empty ones.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        BUCKETS
            .iter()
            .zip(self.counts.iter())
            .map(|((label, _), count)| (*label, *count))
    }
}

/// Serialized as a `label -> count` object in ascending bucket order.
impl Serialize for LatencyHistogram {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(BUCKET_COUNT))?;
        for (label, count) in self.iter() {
            map.serialize_entry(label, &count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LatencyHistogram {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, u64>::deserialize(deserializer)?;
        let mut histogram = LatencyHistogram::default();
        for (label, count) in &raw {
            histogram.set(label, *count);
        }
        Ok(histogram)
    }
}

/// Value at percentile `pct` (0-100) of an ascending slice, using the
/// nearest-rank index `ceil(pct * n / 100) - 1` clamped to the slice.
#[must_use]
pub fn percentile(sorted: &[u64], pct: u64) -> u64 {
    let len = sorted.len();
    if len == 0 {
        return 0;
    }
    let n = u64::try_from(len).unwrap_or(u64::MAX);
    let rank = pct
        .min(100)
        .saturating_mul(n)
        .saturating_add(99)
        .checked_div(100)
        .unwrap_or(0);
    let index = usize::try_from(rank.saturating_sub(1))
        .unwrap_or(usize::MAX)
        .min(len.saturating_sub(1));
    sorted.get(index).copied().unwrap_or(0)
}

/// Builds latency statistics from a buffer of microsecond samples.
#[must_use]
pub fn summarize(mut micros: Vec<u64>) -> LatencyStats {
    if micros.is_empty() {
        return LatencyStats::default();
    }
    micros.sort_unstable();

    let mut histogram = LatencyHistogram::default();
    let mut sum: u128 = 0;
    for value in &micros {
        histogram.record(*value);
        sum = sum.saturating_add(u128::from(*value));
    }

    let count = u64::try_from(micros.len()).unwrap_or(u64::MAX);
    let mean = sum.checked_div(u128::from(count)).unwrap_or(0);
    let min = micros.first().copied().unwrap_or(0);
    let max = micros.last().copied().unwrap_or(0);

    LatencyStats {
        count,
        min: Duration::from_micros(min),
        max: Duration::from_micros(max),
        mean: Duration::from_micros(u64::try_from(mean).unwrap_or(u64::MAX)),
        p50: Duration::from_micros(percentile(&micros, 50)),
        p95: Duration::from_micros(percentile(&micros, 95)),
        p99: Duration::from_micros(percentile(&micros, 99)),
        histogram,
    }
}

/// Saturating conversion of a duration to whole microseconds.
#[must_use]
pub fn duration_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}
