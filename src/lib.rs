//! # laser-recon: Laser-Line Profile Reconstruction
//!
//! Turns per-column laser-center detections from a triangulation camera into
//! metric 2D profiles packed as binary point clouds.
//!
//! ## Architecture
//!
//! - **Filter**: Run-length noise filter over sentinel-encoded sample rows
//! - **Calibration**: Undistortion plus laser-plane homography (nalgebra)
//! - **Cloud**: `PointCloud2`-style binary encoding of the reconstructed points
//! - **Worker**: Queue-fed consumer thread that reconstructs and emits clouds
//! - **Communication**: Crossbeam channels between detector, worker and sinks
//!
//! ## Data Flow
//!
//! ```text
//! detector ──push──▶ [record queue] ──▶ Reconstructor ──▶ CloudSink
//!                                        (prefilter,       (channel,
//!                                         transform,        line filter)
//!                                         encode)
//! ```
//!
//! A record whose id is `"-1"` closes a scan segment and produces an empty
//! cloud; a record with no usable sample produces nothing.
//!
//! ## Example
//!
//! ```ignore
//! use laser_recon::{ReconConfig, ReconstructionWorker, ScanlineRecord, FrameId};
//!
//! let config = ReconConfig::load("recon.toml")?;
//! let (cloud_tx, cloud_rx) = crossbeam_channel::unbounded();
//! let (worker, producer) = ReconstructionWorker::from_config(&config, cloud_tx)?;
//! let handle = worker.start()?;
//!
//! producer.push(ScanlineRecord::from_samples(
//!     FrameId::Frame(0),
//!     chrono::Utc::now(),
//!     detections,
//! ))?;
//!
//! for cloud in cloud_rx.try_iter() {
//!     publish(cloud);
//! }
//!
//! handle.stop();
//! handle.join()?;
//! ```

pub mod calibration;
pub mod cloud;
pub mod config;
pub mod error;
pub mod filter;
pub mod session;
pub mod types;
pub mod worker;

// Re-export commonly used types
pub use calibration::{CalibrationParameters, CalibrationTransform, UndistortConfig};
pub use cloud::{encode, CloudHeader, PointCloudBuffer, PointField, PointFieldType};
pub use config::ReconConfig;
pub use error::{ReconError, Result};
pub use filter::{filter_runs, CloudField, LineFilter, RunFilter};
pub use types::{FrameId, Point3D, ScanlineRecord, INVALID};
pub use worker::{
    CloudSink, OverflowPolicy, PushOutcome, QueueConfig, ReconstructionWorker, Reconstructor,
    ScanlineProducer, WorkerHandle, WorkerState, WorkerStats,
};
