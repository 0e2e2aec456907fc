//! LineFilter: run filter applied to an encoded cloud.
//!
//! Downstream consumers sometimes re-filter a cloud after reconstruction.
//! The run filter walks the cloud's ordered points. In a cloud that is not
//! dense, a point whose chosen field is [`INVALID`](crate::types::INVALID)
//! counts as a gap. A dense cloud has no gaps, so a coordinate that happens
//! to equal the sentinel value is an ordinary point. Points invalidated by
//! the filter are dropped and the survivors re-encoded.
//!
//! Boundary clouds (zero points) pass through untouched. If no point
//! survives, nothing is emitted.

use super::RunFilter;
use crate::cloud::{self, PointCloudBuffer};
use crate::error::Result;
use crate::types::{is_invalid, Point3D};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Gap-free placeholder for the points of a dense cloud
const PRESENT: f32 = 0.0;

/// Point field examined by the [`LineFilter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudField {
    X,
    Y,
    #[default]
    Z,
}

/// Post-pass over emitted clouds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineFilter {
    pub field: CloudField,
    pub run: RunFilter,
}

impl LineFilter {
    pub fn new(run: RunFilter, field: CloudField) -> Self {
        Self { run, field }
    }

    /// Filter `cloud`, returning `None` when every point was removed
    pub fn apply(&self, cloud: PointCloudBuffer) -> Result<Option<PointCloudBuffer>> {
        if cloud.is_empty() {
            return Ok(Some(cloud));
        }

        let points = cloud.points()?;
        let mut marks: Vec<f32> = if cloud.is_dense {
            vec![PRESENT; points.len()]
        } else {
            points.iter().map(|p| self.field_value(p)).collect()
        };

        let removed = super::filter_runs(
            &mut marks,
            self.run.length,
            self.run.stride,
            self.run.gap_tolerance,
        );

        let survivors: Vec<Point3D> = points
            .iter()
            .zip(&marks)
            .filter(|(_, mark)| !is_invalid(**mark))
            .map(|(p, _)| *p)
            .collect();

        trace!(
            frame = %cloud.header.frame_id,
            removed,
            kept = survivors.len(),
            "Line filter applied"
        );

        if survivors.is_empty() {
            return Ok(None);
        }
        cloud::encode(cloud.header, &survivors).map(Some)
    }

    fn field_value(&self, p: &Point3D) -> f32 {
        match self.field {
            CloudField::X => p.x,
            CloudField::Y => p.y,
            CloudField::Z => p.z,
        }
    }
}
