//! Record queue between the detector thread and the reconstruction worker.
//!
//! The queue is a crossbeam channel. How a full queue behaves is chosen with
//! [`OverflowPolicy`]; the default never blocks the producer and evicts the
//! oldest queued record instead.
//!
//! End-of-stream markers are never evicted. A marker found at the front of a
//! full queue is set aside and handed to the worker before anything still
//! queued, so segment boundaries survive overflow. Eviction and the worker's
//! receive run under the same lock to keep that order.

use super::stats::StatsCounters;
use crate::error::{ReconError, Result};
use crate::types::ScanlineRecord;
use crossbeam_channel::{bounded, never, unbounded, Receiver, Sender, TryRecvError, TrySendError};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Default queue capacity in records
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// What happens when a push finds the queue full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued record to make room
    #[default]
    DropOldest,
    /// Block the producer until the worker catches up
    Block,
    /// Never refuse a record; `capacity` is only a warning mark
    Unbounded,
}

/// Queue settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub capacity: usize,
    pub overflow: OverflowPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            overflow: OverflowPolicy::default(),
        }
    }
}

/// End-of-stream markers pulled off the front of a full queue
type HeldMarkers = Arc<Mutex<VecDeque<ScanlineRecord>>>;

fn lock(held: &HeldMarkers) -> MutexGuard<'_, VecDeque<ScanlineRecord>> {
    held.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Result of a successful push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Record queued, nothing lost
    Queued,
    /// Record queued after evicting the oldest queued record
    DroppedOldest,
}

/// Producer side of the record queue.
///
/// Dropping every producer lets the worker drain what is queued and exit.
pub struct ScanlineProducer {
    tx: Sender<ScanlineRecord>,
    /// Receiver clone used only to evict under [`OverflowPolicy::DropOldest`]
    evict_rx: Option<Receiver<ScanlineRecord>>,
    held: HeldMarkers,
    config: QueueConfig,
    above_mark: AtomicBool,
    closed: Arc<AtomicBool>,
    stats: Arc<StatsCounters>,
}

/// Worker side of the record queue
pub(crate) struct RecordReceiver {
    rx: Receiver<ScanlineRecord>,
    held: HeldMarkers,
}

impl RecordReceiver {
    /// Next record in FIFO order, held markers first
    pub(crate) fn try_next(&self) -> std::result::Result<ScanlineRecord, TryRecvError> {
        let mut held = lock(&self.held);
        if let Some(marker) = held.pop_front() {
            return Ok(marker);
        }
        self.rx.try_recv()
    }

    /// Channel to wait on for readiness; records are taken with [`Self::try_next`]
    pub(crate) fn receiver(&self) -> &Receiver<ScanlineRecord> {
        &self.rx
    }

    /// Stop receiving and return how many records were left behind.
    ///
    /// The channel is dropped without being drained, so a producer blocked on
    /// a full queue fails instead of landing a record nobody will read.
    pub(crate) fn close(&mut self) -> u64 {
        let rx = std::mem::replace(&mut self.rx, never());
        let held = lock(&self.held).drain(..).count();
        let queued = rx.len();
        drop(rx);
        (held + queued) as u64
    }
}

/// Create the queue, returning the producer and the worker's receiver
pub(crate) fn record_queue(
    config: QueueConfig,
    closed: Arc<AtomicBool>,
    stats: Arc<StatsCounters>,
) -> (ScanlineProducer, RecordReceiver) {
    let capacity = config.capacity.max(1);
    let (tx, rx) = match config.overflow {
        OverflowPolicy::DropOldest | OverflowPolicy::Block => bounded(capacity),
        OverflowPolicy::Unbounded => unbounded(),
    };
    let evict_rx = (config.overflow == OverflowPolicy::DropOldest).then(|| rx.clone());
    let held = HeldMarkers::default();

    let producer = ScanlineProducer {
        tx,
        evict_rx,
        held: held.clone(),
        config: QueueConfig { capacity, ..config },
        above_mark: AtomicBool::new(false),
        closed,
        stats,
    };
    (producer, RecordReceiver { rx, held })
}

impl ScanlineProducer {
    /// Hand a record to the worker.
    ///
    /// Fails only once the worker has shut down.
    pub fn push(&self, record: ScanlineRecord) -> Result<PushOutcome> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(stopped());
        }

        let outcome = match self.config.overflow {
            OverflowPolicy::DropOldest => self.push_drop_oldest(record)?,
            OverflowPolicy::Block => {
                // Fails if the worker shuts down while this push waits for room
                self.tx.send(record).map_err(|_| stopped())?;
                PushOutcome::Queued
            }
            OverflowPolicy::Unbounded => {
                self.tx.send(record).map_err(disconnected)?;
                self.check_high_water();
                PushOutcome::Queued
            }
        };

        self.stats.records_received.fetch_add(1, Ordering::Relaxed);
        Ok(outcome)
    }

    fn push_drop_oldest(&self, mut record: ScanlineRecord) -> Result<PushOutcome> {
        let mut evicted = false;
        loop {
            match self.tx.try_send(record) {
                Ok(()) => break,
                Err(TrySendError::Full(back)) => {
                    record = back;
                    if self.evict_front() {
                        evicted = true;
                    }
                }
                Err(TrySendError::Disconnected(_)) => {
                    return Err(disconnected(()));
                }
            }
        }

        Ok(if evicted {
            PushOutcome::DroppedOldest
        } else {
            PushOutcome::Queued
        })
    }

    /// Make room by taking the front record off a full queue.
    ///
    /// Returns `true` if a frame was dropped. A marker at the front is held
    /// for the worker instead.
    fn evict_front(&self) -> bool {
        let Some(rx) = &self.evict_rx else {
            return false;
        };
        let mut held = lock(&self.held);
        // The worker may have made room since the failed send
        if !self.tx.is_full() {
            return false;
        }

        match rx.try_recv() {
            Ok(marker) if marker.is_end_of_stream() => {
                debug!("Holding end-of-stream marker out of a full queue");
                held.push_back(marker);
                false
            }
            Ok(old) => {
                let dropped = self.stats.records_overflowed.fetch_add(1, Ordering::Relaxed) + 1;
                let err = ReconError::QueueOverflow { dropped };
                warn!(frame = %old.frame_id, "{}", err);
                true
            }
            Err(_) => false,
        }
    }

    fn check_high_water(&self) {
        let backlog = self.tx.len();
        let above = backlog > self.config.capacity;
        if above && !self.above_mark.swap(true, Ordering::Relaxed) {
            warn!(
                backlog,
                mark = self.config.capacity,
                "Record backlog crossed the high-water mark"
            );
        } else if !above {
            self.above_mark.store(false, Ordering::Relaxed);
        }
    }

    /// Records currently waiting in the queue
    pub fn backlog(&self) -> usize {
        self.tx.len()
    }

    pub fn config(&self) -> QueueConfig {
        self.config
    }
}

fn disconnected<T>(_: T) -> ReconError {
    ReconError::Channel("record queue disconnected".to_string())
}

fn stopped() -> ReconError {
    ReconError::Channel("reconstruction worker has stopped".to_string())
}
