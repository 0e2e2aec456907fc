//! Point codec: `[Point3D]` → [`PointCloudBuffer`].
//!
//! Layout: one row, `width = n`, 12-byte points with float32 fields
//! `x@0`, `y@4`, `z@8`, little-endian, dense.

use super::{CloudHeader, PointCloudBuffer, PointField, PointFieldType};
use crate::error::{ReconError, Result};
use crate::types::Point3D;

/// Bytes per encoded point
pub const POINT_STEP: u32 = 12;

/// Field descriptors of an `x/y/z` float cloud
pub fn xyz_fields() -> Vec<PointField> {
    vec![
        PointField::new("x", 0, PointFieldType::Float32, 1),
        PointField::new("y", 4, PointFieldType::Float32, 1),
        PointField::new("z", 8, PointFieldType::Float32, 1),
    ]
}

/// Encode points into a single-row cloud.
///
/// The result is validated before it is returned, so a buffer that does not
/// match its own layout never reaches a consumer.
pub fn encode(header: CloudHeader, points: &[Point3D]) -> Result<PointCloudBuffer> {
    let width = u32::try_from(points.len()).map_err(|_| {
        ReconError::EncodingInvariant(format!("{} points do not fit one row", points.len()))
    })?;
    let row_step = POINT_STEP.checked_mul(width).ok_or_else(|| {
        ReconError::EncodingInvariant(format!("row of {} points overflows row_step", width))
    })?;

    let cloud = PointCloudBuffer {
        header,
        height: 1,
        width,
        fields: xyz_fields(),
        is_bigendian: false,
        point_step: POINT_STEP,
        row_step,
        data: point_bytes(points),
        is_dense: true,
    };
    cloud.validate()?;
    Ok(cloud)
}

#[cfg(target_endian = "little")]
fn point_bytes(points: &[Point3D]) -> Vec<u8> {
    bytemuck::cast_slice::<Point3D, u8>(points).to_vec()
}

#[cfg(target_endian = "big")]
fn point_bytes(points: &[Point3D]) -> Vec<u8> {
    let mut out = Vec::with_capacity(points.len() * POINT_STEP as usize);
    for p in points {
        out.extend_from_slice(&p.x.to_le_bytes());
        out.extend_from_slice(&p.y.to_le_bytes());
        out.extend_from_slice(&p.z.to_le_bytes());
    }
    out
}
