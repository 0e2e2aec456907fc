//! Worker counters.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the worker counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkerStats {
    /// Records accepted by the queue
    pub records_received: u64,
    /// Records taken off the queue and processed
    pub records_processed: u64,
    /// Non-empty clouds handed to the sink
    pub clouds_emitted: u64,
    /// Segment-boundary clouds handed to the sink
    pub boundaries_emitted: u64,
    /// Records that produced no cloud
    pub silent_records: u64,
    /// Samples lost to transform failures
    pub samples_dropped: u64,
    /// Samples invalidated by the pre-pass run filter
    pub samples_prefiltered: u64,
    /// Records evicted because the queue was full
    pub records_overflowed: u64,
    /// Emissions the sink refused
    pub sink_errors: u64,
    /// Records still queued when the worker was stopped
    pub records_discarded: u64,
}

impl WorkerStats {
    /// Fraction of processed records that produced output
    pub fn emission_rate(&self) -> f64 {
        if self.records_processed == 0 {
            0.0
        } else {
            (self.clouds_emitted + self.boundaries_emitted) as f64 / self.records_processed as f64
        }
    }
}

/// Shared atomic counters, written by the producer and the worker thread
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub records_received: AtomicU64,
    pub records_processed: AtomicU64,
    pub clouds_emitted: AtomicU64,
    pub boundaries_emitted: AtomicU64,
    pub silent_records: AtomicU64,
    pub samples_dropped: AtomicU64,
    pub samples_prefiltered: AtomicU64,
    pub records_overflowed: AtomicU64,
    pub sink_errors: AtomicU64,
    pub records_discarded: AtomicU64,
}

impl StatsCounters {
    pub fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WorkerStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        WorkerStats {
            records_received: load(&self.records_received),
            records_processed: load(&self.records_processed),
            clouds_emitted: load(&self.clouds_emitted),
            boundaries_emitted: load(&self.boundaries_emitted),
            silent_records: load(&self.silent_records),
            samples_dropped: load(&self.samples_dropped),
            samples_prefiltered: load(&self.samples_prefiltered),
            records_overflowed: load(&self.records_overflowed),
            sink_errors: load(&self.sink_errors),
            records_discarded: load(&self.records_discarded),
        }
    }
}
