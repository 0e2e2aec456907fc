//! Session data types

use crate::cloud::PointCloudBuffer;
use crate::error::Result;
use crate::types::{FrameId, Point3D};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Human-readable view of an emitted cloud
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudSummary {
    pub frame_id: FrameId,
    pub stamp: DateTime<Utc>,
    pub width: u32,
    pub point_step: u32,
    pub row_step: u32,
    pub is_dense: bool,
    pub points: Vec<Point3D>,
}

impl CloudSummary {
    /// Decode a cloud; fails if the buffer does not match its layout
    pub fn from_cloud(cloud: &PointCloudBuffer) -> Result<Self> {
        Ok(Self {
            frame_id: cloud.header.frame_id,
            stamp: cloud.header.stamp,
            width: cloud.width,
            point_step: cloud.point_step,
            row_step: cloud.row_step,
            is_dense: cloud.is_dense,
            points: cloud.points()?,
        })
    }

    /// Check if this marks the end of a scan segment
    pub fn is_boundary(&self) -> bool {
        self.frame_id.is_end_of_stream() && self.points.is_empty()
    }
}
