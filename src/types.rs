//! Core data types for laser-recon
//!
//! # Main Types
//!
//! - [`FrameId`] - Frame number or the reserved end-of-stream marker
//! - [`ScanlineRecord`] - One frame of per-column laser centers
//! - [`Point3D`] - A reconstructed point, laid out exactly as in the binary cloud
//!
//! # Invalid Samples
//!
//! The center detector reports "no laser found in this column" with the
//! sentinel [`INVALID`]. The sentinel survives in the internal sample buffer
//! because the run filter and legacy consumers work on it directly; code
//! outside the crate should build records from `Option<f32>` via
//! [`ScanlineRecord::from_samples`] and read them back with
//! [`ScanlineRecord::sample`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel sample value meaning "no detection at this column"
pub const INVALID: f32 = -1.0;

/// String form of the end-of-stream identifier on the wire
pub const END_OF_STREAM_ID: &str = "-1";

/// Returns true if `value` is the invalid sentinel
#[inline]
pub fn is_invalid(value: f32) -> bool {
    value == INVALID
}

/// Identifier carried by a scanline record and propagated into its cloud
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FrameId {
    /// Ordinary frame sequence number
    Frame(u64),
    /// Reserved marker closing a scan segment
    EndOfStream,
}

impl FrameId {
    /// Check if this is the end-of-stream marker
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, FrameId::EndOfStream)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameId::Frame(n) => write!(f, "{}", n),
            FrameId::EndOfStream => f.write_str(END_OF_STREAM_ID),
        }
    }
}

impl FromStr for FrameId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == END_OF_STREAM_ID {
            return Ok(FrameId::EndOfStream);
        }
        s.parse::<u64>()
            .map(FrameId::Frame)
            .map_err(|e| format!("invalid frame id '{}': {}", s, e))
    }
}

impl TryFrom<String> for FrameId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FrameId> for String {
    fn from(id: FrameId) -> Self {
        id.to_string()
    }
}

/// One frame worth of laser-center measurements, one sample per scan column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanlineRecord {
    /// Frame identifier (or end-of-stream marker)
    pub frame_id: FrameId,
    /// Camera capture timestamp supplied by the producer
    pub stamp: DateTime<Utc>,
    /// Row coordinate per column, [`INVALID`] where nothing was detected
    #[serde(rename = "center")]
    samples: Vec<f32>,
}

impl ScanlineRecord {
    /// Create a record from optional samples (`None` = no detection)
    pub fn from_samples<I>(frame_id: FrameId, stamp: DateTime<Utc>, samples: I) -> Self
    where
        I: IntoIterator<Item = Option<f32>>,
    {
        Self {
            frame_id,
            stamp,
            samples: samples
                .into_iter()
                .map(|s| s.unwrap_or(INVALID))
                .collect(),
        }
    }

    /// Create a record from a sentinel-encoded buffer as produced by legacy detectors
    pub fn from_raw(frame_id: FrameId, stamp: DateTime<Utc>, samples: Vec<f32>) -> Self {
        Self {
            frame_id,
            stamp,
            samples,
        }
    }

    /// Create an end-of-stream marker record
    pub fn end_of_stream(stamp: DateTime<Utc>) -> Self {
        Self::from_raw(FrameId::EndOfStream, stamp, Vec::new())
    }

    /// Check if this record closes a scan segment
    pub fn is_end_of_stream(&self) -> bool {
        self.frame_id.is_end_of_stream()
    }

    /// Number of columns in the record
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the record has no columns at all
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample at a column, `None` if invalid or out of range
    pub fn sample(&self, column: usize) -> Option<f32> {
        self.samples.get(column).copied().filter(|v| !is_invalid(*v))
    }

    /// Iterate over `(column, sample)` with invalid columns as `None`
    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<f32>)> + '_ {
        self.samples
            .iter()
            .enumerate()
            .map(|(i, &v)| (i, if is_invalid(v) { None } else { Some(v) }))
    }

    /// Number of columns holding a detection
    pub fn valid_count(&self) -> usize {
        self.samples.iter().filter(|v| !is_invalid(**v)).count()
    }

    /// Raw sentinel-encoded samples
    pub fn raw_samples(&self) -> &[f32] {
        &self.samples
    }

    /// Mutable raw samples, used by the in-place run filter
    pub fn raw_samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }
}

/// A reconstructed point
///
/// `#[repr(C)]` with three `f32` fields matches the 12-byte point layout of
/// the binary cloud, which lets the codec copy a point slice in one go.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, bytemuck::Pod, bytemuck::Zeroable,
)]
pub struct Point3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3D {
    /// Create a new point
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Point on the laser plane; `x` is the travel axis, supplied elsewhere
    pub fn planar(y: f32, z: f32) -> Self {
        Self { x: 0.0, y, z }
    }

    /// Check that every coordinate is finite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}
