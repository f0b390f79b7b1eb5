use std::ops::Range;

use crate::args::PositiveU64;

/// Split of `total` requests into consecutive batches of at most
/// `batch_size`; only the last batch may be smaller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    total: u64,
    batch_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    /// 0-based batch index.
    pub index: u64,
    /// First sequence number in the batch.
    pub start: u64,
    /// One past the last sequence number.
    pub end: u64,
}

impl Batch {
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub const fn sequences(&self) -> Range<u64> {
        self.start..self.end
    }
}

impl BatchPlan {
    #[must_use]
    pub fn new(total: PositiveU64, batch_size: PositiveU64) -> Self {
        Self {
            total: total.get(),
            batch_size: batch_size.get().min(total.get()),
        }
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    #[must_use]
    pub const fn batch_size(&self) -> u64 {
        self.batch_size
    }

    /// `ceil(total / batch_size)`.
    #[must_use]
    pub const fn batch_count(&self) -> u64 {
        self.total.div_ceil(self.batch_size)
    }

    pub fn batches(&self) -> impl Iterator<Item = Batch> + '_ {
        (0..self.batch_count()).map(|index| {
            let start = index.saturating_mul(self.batch_size);
            Batch {
                index,
                start,
                end: start.saturating_add(self.batch_size).min(self.total),
            }
        })
    }
}
