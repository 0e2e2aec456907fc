//! Binary point-cloud buffers.
//!
//! [`PointCloudBuffer`] is the wire format handed to downstream consumers
//! (visualization, logging, seam extraction). The layout follows the common
//! `PointCloud2` convention: a header, a list of field descriptors, and a
//! flat little-endian byte buffer of `height * row_step` bytes.
//!
//! The reconstruction core only ever writes clouds of `x/y/z` float points;
//! see [`codec::encode`].

pub mod codec;

pub use codec::{encode, POINT_STEP};

use crate::error::{ReconError, Result};
use crate::types::{FrameId, Point3D};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scalar type of a point field (numeric codes match `PointField` datatypes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum PointFieldType {
    Int8 = 1,
    UInt8 = 2,
    Int16 = 3,
    UInt16 = 4,
    Int32 = 5,
    UInt32 = 6,
    Float32 = 7,
    Float64 = 8,
}

impl PointFieldType {
    /// Size of one element in bytes
    pub fn size_bytes(self) -> u32 {
        match self {
            PointFieldType::Int8 | PointFieldType::UInt8 => 1,
            PointFieldType::Int16 | PointFieldType::UInt16 => 2,
            PointFieldType::Int32 | PointFieldType::UInt32 | PointFieldType::Float32 => 4,
            PointFieldType::Float64 => 8,
        }
    }

    /// Numeric datatype code
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Describes one named field inside a point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointField {
    pub name: String,
    /// Byte offset from the start of the point
    pub offset: u32,
    pub datatype: PointFieldType,
    /// Number of elements
    pub count: u32,
}

impl PointField {
    pub fn new(name: impl Into<String>, offset: u32, datatype: PointFieldType, count: u32) -> Self {
        Self {
            name: name.into(),
            offset,
            datatype,
            count,
        }
    }

    /// First byte past this field
    pub fn end(&self) -> u32 {
        self.offset + self.datatype.size_bytes() * self.count
    }
}

/// Identity and capture time propagated from the source record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudHeader {
    pub frame_id: FrameId,
    pub stamp: DateTime<Utc>,
}

impl CloudHeader {
    pub fn new(frame_id: FrameId, stamp: DateTime<Utc>) -> Self {
        Self { frame_id, stamp }
    }
}

/// An encoded point cloud
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloudBuffer {
    pub header: CloudHeader,
    pub height: u32,
    pub width: u32,
    pub fields: Vec<PointField>,
    pub is_bigendian: bool,
    /// Bytes per point
    pub point_step: u32,
    /// Bytes per row
    pub row_step: u32,
    pub data: Vec<u8>,
    /// True when the cloud holds no invalid points
    pub is_dense: bool,
}

impl PointCloudBuffer {
    /// Zero-point cloud marking the end of a scan segment
    pub fn boundary(header: CloudHeader) -> Self {
        Self {
            header,
            height: 1,
            width: 0,
            fields: codec::xyz_fields(),
            is_bigendian: false,
            point_step: POINT_STEP,
            row_step: 0,
            data: Vec::new(),
            is_dense: true,
        }
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Check if the cloud holds no points
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a field descriptor by name
    pub fn field(&self, name: &str) -> Option<&PointField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check that the byte buffer agrees with the layout description
    pub fn validate(&self) -> Result<()> {
        let expected_row = self.point_step as u64 * self.width as u64;
        if self.row_step as u64 != expected_row {
            return Err(ReconError::EncodingInvariant(format!(
                "row_step {} != point_step {} x width {}",
                self.row_step, self.point_step, self.width
            )));
        }

        let expected_len = self.row_step as u64 * self.height as u64;
        if self.data.len() as u64 != expected_len {
            return Err(ReconError::EncodingInvariant(format!(
                "data holds {} bytes, layout requires {}",
                self.data.len(),
                expected_len
            )));
        }

        if let Some(f) = self.fields.iter().find(|f| f.end() > self.point_step) {
            return Err(ReconError::EncodingInvariant(format!(
                "field '{}' ends at byte {} beyond point_step {}",
                f.name,
                f.end(),
                self.point_step
            )));
        }

        Ok(())
    }

    /// Read back the `x/y/z` triples.
    ///
    /// Only used by downstream stages that re-filter an emitted cloud; the
    /// reconstruction path never decodes.
    pub fn points(&self) -> Result<Vec<Point3D>> {
        self.validate()?;
        if self.is_bigendian {
            return Err(ReconError::EncodingInvariant(
                "big-endian clouds are not supported".to_string(),
            ));
        }

        let offsets = ["x", "y", "z"].map(|name| {
            self.field(name)
                .filter(|f| f.datatype == PointFieldType::Float32)
                .map(|f| f.offset as usize)
        });
        let [Some(ox), Some(oy), Some(oz)] = offsets else {
            return Err(ReconError::EncodingInvariant(
                "cloud lacks float32 x/y/z fields".to_string(),
            ));
        };

        let step = self.point_step as usize;
        if step == 0 {
            return Ok(Vec::new());
        }
        let read = |chunk: &[u8], at: usize| {
            f32::from_le_bytes([chunk[at], chunk[at + 1], chunk[at + 2], chunk[at + 3]])
        };

        Ok(self
            .data
            .chunks_exact(step)
            .map(|chunk| Point3D::new(read(chunk, ox), read(chunk, oy), read(chunk, oz)))
            .collect())
    }
}
