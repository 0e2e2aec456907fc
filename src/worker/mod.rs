//! Reconstruction worker.
//!
//! One detector thread pushes [`ScanlineRecord`]s through a
//! [`ScanlineProducer`]; one worker thread pops them in FIFO order, runs the
//! [`Reconstructor`] and hands each resulting cloud to a [`CloudSink`].
//!
//! # Lifecycle
//!
//! ```text
//!   Idle ──push──▶ Processing ──emit──▶ Idle
//!     │                                  │
//!     └──────────── stop() ──────────────┴──▶ ShuttingDown
//! ```
//!
//! `stop()` wakes a worker blocked on an empty queue. The record being
//! processed finishes; records still queued are discarded and counted.
//! Dropping every producer also ends the worker, after the queue drains.
//!
//! # Example
//!
//! ```ignore
//! use laser_recon::worker::ReconstructionWorker;
//!
//! let (cloud_tx, cloud_rx) = crossbeam_channel::unbounded();
//! let (worker, producer) = ReconstructionWorker::from_config(&config, cloud_tx)?;
//! let handle = worker.start()?;
//!
//! producer.push(record)?;
//! let cloud = cloud_rx.recv()?;
//!
//! handle.stop();
//! let stats = handle.join()?;
//! ```

pub mod queue;
pub mod reconstructor;
pub mod sink;
pub mod stats;

pub use queue::{OverflowPolicy, PushOutcome, QueueConfig, ScanlineProducer, DEFAULT_QUEUE_CAPACITY};
pub use reconstructor::Reconstructor;
pub use sink::{CloudSink, LineFilterSink};
pub use stats::WorkerStats;

use crate::calibration::{CalibrationTransform, UndistortConfig};
use crate::config::ReconConfig;
use crate::error::{ReconError, Result, ResultExt};
use crate::filter::RunFilter;
use crate::types::ScanlineRecord;
use crossbeam_channel::{bounded, Receiver, Select, Sender, TryRecvError};
use queue::RecordReceiver;
use stats::StatsCounters;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info};

/// Observable worker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Waiting for a record
    Idle = 0,
    /// Reconstructing a record
    Processing = 1,
    /// Stopped or stopping; terminal
    ShuttingDown = 2,
}

impl WorkerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => WorkerState::Idle,
            1 => WorkerState::Processing,
            _ => WorkerState::ShuttingDown,
        }
    }
}

/// Shared flags between the worker thread and its handle
struct Control {
    running: AtomicBool,
    /// Set once the worker stops accepting records
    closed: Arc<AtomicBool>,
    state: AtomicU8,
}

impl Control {
    fn set_state(&self, state: WorkerState) {
        // ShuttingDown is terminal
        let _ = self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
                (cur != WorkerState::ShuttingDown as u8).then_some(state as u8)
            });
    }

    fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::SeqCst))
    }
}

/// Consumer side: owns the queue receiver, the reconstructor and the sink
pub struct ReconstructionWorker<S> {
    records: RecordReceiver,
    reconstructor: Reconstructor,
    sink: S,
    control: Arc<Control>,
    shutdown_tx: Sender<()>,
    shutdown_rx: Receiver<()>,
    stats: Arc<StatsCounters>,
}

impl<S: CloudSink> ReconstructionWorker<S> {
    /// Create a worker and the producer feeding it
    pub fn new(
        transform: CalibrationTransform,
        prefilter: Option<RunFilter>,
        queue: QueueConfig,
        sink: S,
    ) -> (Self, ScanlineProducer) {
        let stats = Arc::new(StatsCounters::default());
        let control = Arc::new(Control {
            running: AtomicBool::new(true),
            closed: Arc::new(AtomicBool::new(false)),
            state: AtomicU8::new(WorkerState::Idle as u8),
        });
        let (producer, records) = queue::record_queue(queue, control.closed.clone(), stats.clone());
        let (shutdown_tx, shutdown_rx) = bounded(1);

        let worker = Self {
            records,
            reconstructor: Reconstructor::with_counters(transform, prefilter, stats.clone()),
            sink,
            control,
            shutdown_tx,
            shutdown_rx,
            stats,
        };
        (worker, producer)
    }

    /// Build from a loaded configuration; calibration errors are fatal here
    pub fn from_config(config: &ReconConfig, sink: S) -> Result<(Self, ScanlineProducer)> {
        let params = config
            .calibration
            .parameters()
            .context("Invalid calibration")?;
        let transform = CalibrationTransform::new(&params, config.calibration.undistort)
            .context("Invalid calibration")?;
        Ok(Self::new(
            transform,
            config.prefilter_params(),
            config.queue,
            sink,
        ))
    }

    /// Worker with identity calibration and default settings, for tests and demos
    pub fn identity(sink: S) -> Result<(Self, ScanlineProducer)> {
        let transform = CalibrationTransform::new(
            &crate::calibration::CalibrationParameters::identity(),
            UndistortConfig::default(),
        )?;
        Ok(Self::new(transform, None, QueueConfig::default(), sink))
    }

    /// Process at most one queued record without blocking.
    ///
    /// Returns `true` if a record was taken off the queue.
    pub fn drive_once(&mut self) -> bool {
        match self.records.try_next() {
            Ok(record) => {
                self.handle(record);
                true
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => false,
        }
    }

    /// Run the consumer loop on the current thread until stopped or every
    /// producer is gone
    pub fn run(&mut self) {
        info!("Reconstruction worker started");

        while self.control.running.load(Ordering::SeqCst) {
            self.control.set_state(WorkerState::Idle);
            match self.records.try_next() {
                Ok(record) => {
                    self.handle(record);
                    continue;
                }
                Err(TryRecvError::Disconnected) => {
                    debug!("All producers dropped");
                    break;
                }
                Err(TryRecvError::Empty) => {}
            }

            // Wait for a record or a stop request without taking either
            let mut sel = Select::new();
            sel.recv(self.records.receiver());
            let shutdown = sel.recv(&self.shutdown_rx);
            if sel.ready() == shutdown {
                break;
            }
        }

        self.shut_down();
    }

    /// Spawn the consumer thread
    pub fn start(mut self) -> Result<WorkerHandle>
    where
        S: Send + 'static,
    {
        let control = self.control.clone();
        let stats = self.stats.clone();
        let shutdown_tx = self.shutdown_tx.clone();

        let thread = std::thread::Builder::new()
            .name("recon-worker".to_string())
            .spawn(move || self.run())
            .map_err(ReconError::from)
            .context("Failed to spawn reconstruction worker")?;

        Ok(WorkerHandle {
            control,
            stats,
            shutdown_tx,
            thread: Some(thread),
        })
    }

    pub fn state(&self) -> WorkerState {
        self.control.state()
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats.snapshot()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn handle(&mut self, record: ScanlineRecord) {
        self.control.set_state(WorkerState::Processing);
        let frame = record.frame_id;

        if let Some(cloud) = self.reconstructor.process(record) {
            if let Err(e) = self.sink.publish(cloud) {
                error!(%frame, "Failed to publish cloud: {}", e);
                StatsCounters::bump(&self.stats.sink_errors, 1);
            }
        }
    }

    fn shut_down(&mut self) {
        self.control.running.store(false, Ordering::SeqCst);
        self.control.closed.store(true, Ordering::SeqCst);
        self.control.set_state(WorkerState::ShuttingDown);

        let discarded = self.records.close();
        if discarded > 0 {
            info!(discarded, "Discarded queued records on shutdown");
            StatsCounters::bump(&self.stats.records_discarded, discarded);
        }

        let stats = self.stats.snapshot();
        info!(
            processed = stats.records_processed,
            clouds = stats.clouds_emitted,
            boundaries = stats.boundaries_emitted,
            "Reconstruction worker stopped"
        );
    }
}

/// Control handle for a running worker thread
pub struct WorkerHandle {
    control: Arc<Control>,
    stats: Arc<StatsCounters>,
    shutdown_tx: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request shutdown, waking the worker if it is idle
    pub fn stop(&self) {
        if self.control.running.swap(false, Ordering::SeqCst) {
            let _ = self.shutdown_tx.try_send(());
        }
    }

    /// Wait for the worker thread to exit and return the final counters
    pub fn join(mut self) -> Result<WorkerStats> {
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|_| ReconError::Channel("reconstruction worker panicked".to_string()))?;
        }
        Ok(self.stats.snapshot())
    }

    pub fn state(&self) -> WorkerState {
        self.control.state()
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats.snapshot()
    }

    /// Check if the worker thread has exited
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
