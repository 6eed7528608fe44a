//! Runtime counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a session's counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Sampling ticks that committed a record
    pub samples: u64,
    /// Sampling ticks without an expression frame
    pub tracking_gaps: u64,
    pub dispatched: u64,
    pub unchanged_skips: u64,
    pub blank_skips: u64,
    /// Publishes that failed or timed out
    pub publish_failures: u64,
    /// File-save ticks that produced a write job
    pub persisted_ticks: u64,
    pub persist_skips: u64,
    pub text_write_failures: u64,
    pub image_write_failures: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counter(AtomicU64);

impl Counter {
    #[inline]
    pub(crate) fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Live counters shared by the scheduler and its jobs
#[derive(Debug, Default)]
pub struct StatsCounters {
    pub(crate) samples: Counter,
    pub(crate) tracking_gaps: Counter,
    pub(crate) dispatched: Counter,
    pub(crate) unchanged_skips: Counter,
    pub(crate) blank_skips: Counter,
    pub(crate) publish_failures: Counter,
    pub(crate) persisted_ticks: Counter,
    pub(crate) persist_skips: Counter,
    pub(crate) text_write_failures: Counter,
    pub(crate) image_write_failures: Counter,
}

impl StatsCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> RuntimeStats {
        RuntimeStats {
            samples: self.samples.get(),
            tracking_gaps: self.tracking_gaps.get(),
            dispatched: self.dispatched.get(),
            unchanged_skips: self.unchanged_skips.get(),
            blank_skips: self.blank_skips.get(),
            publish_failures: self.publish_failures.get(),
            persisted_ticks: self.persisted_ticks.get(),
            persist_skips: self.persist_skips.get(),
            text_write_failures: self.text_write_failures.get(),
            image_write_failures: self.image_write_failures.get(),
        }
    }
}
