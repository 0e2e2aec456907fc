//! Calibration transform: detected laser pixel → point on the laser plane.
//!
//! A sample at column `c` with row value `r` is treated as the pixel
//! `(r, c)`. The pixel is undistorted back into the same intrinsic pixel
//! space (`K⁻¹`, Brown-Conrady inversion, `K`) and then mapped through the
//! plane homography `H`. The result is `(0, y', z')`; the travel axis `x`
//! is filled in by downstream stitching.
//!
//! The transform is immutable after construction and shared read-only by the
//! worker.

pub mod distortion;

pub use distortion::{BrownConrady, UndistortConfig};

use crate::error::{ReconError, Result};
use crate::types::Point3D;
use nalgebra::{Matrix3, Vector2, Vector3};

/// Smallest homogeneous weight accepted before the division
const MIN_WEIGHT: f64 = 1e-12;

/// Raw calibration arrays, row-major
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationParameters {
    pub camera_matrix: [f64; 9],
    pub distort_coeffs: [f64; 5],
    pub homography_matrix: [f64; 9],
}

impl CalibrationParameters {
    /// Build from flat slices of length 9, 5 and 9
    pub fn from_slices(camera: &[f64], distortion: &[f64], homography: &[f64]) -> Result<Self> {
        Ok(Self {
            camera_matrix: fixed("camera_matrix", camera)?,
            distort_coeffs: fixed("distort_coeffs", distortion)?,
            homography_matrix: fixed("homography_matrix", homography)?,
        })
    }

    /// Identity intrinsics, no distortion, identity homography
    pub fn identity() -> Self {
        let eye = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        Self {
            camera_matrix: eye,
            distort_coeffs: [0.0; 5],
            homography_matrix: eye,
        }
    }
}

fn fixed<const N: usize>(name: &str, values: &[f64]) -> Result<[f64; N]> {
    let arr: [f64; N] = values.try_into().map_err(|_| {
        ReconError::Configuration(format!("{} needs {} values, got {}", name, N, values.len()))
    })?;
    if let Some(i) = arr.iter().position(|v| !v.is_finite()) {
        return Err(ReconError::Configuration(format!(
            "{}[{}] is not finite",
            name, i
        )));
    }
    Ok(arr)
}

/// Immutable pixel-to-plane transform
#[derive(Debug, Clone)]
pub struct CalibrationTransform {
    k: Matrix3<f64>,
    k_inv: Matrix3<f64>,
    distortion: BrownConrady,
    homography: Matrix3<f64>,
    undistort: UndistortConfig,
}

impl CalibrationTransform {
    /// Build a transform, rejecting a non-invertible camera matrix.
    ///
    /// The homography is not checked here; a degenerate `H` shows up as a
    /// per-sample [`ReconError::Transform`].
    pub fn new(params: &CalibrationParameters, undistort: UndistortConfig) -> Result<Self> {
        let k = Matrix3::from_row_slice(&params.camera_matrix);
        let k_inv = k.try_inverse().ok_or_else(|| {
            ReconError::Configuration("camera_matrix is not invertible".to_string())
        })?;

        Ok(Self {
            k,
            k_inv,
            distortion: BrownConrady::from_coeffs(params.distort_coeffs),
            homography: Matrix3::from_row_slice(&params.homography_matrix),
            undistort,
        })
    }

    /// Transform with default undistortion settings
    pub fn from_parameters(params: &CalibrationParameters) -> Result<Self> {
        Self::new(params, UndistortConfig::default())
    }

    /// Map the sample `row` found at `column` onto the laser plane
    pub fn apply(&self, column: usize, row: f32) -> Result<Point3D> {
        let fail = |message: &str| ReconError::Transform {
            column,
            message: message.to_string(),
        };

        let pixel = Vector3::new(row as f64, column as f64, 1.0);

        let normalized = dehomogenize(self.k_inv * pixel).ok_or_else(|| fail("normalization failed"))?;
        let ideal = self
            .distortion
            .undistort(normalized, self.undistort)
            .ok_or_else(|| fail("undistortion diverged"))?;
        let undistorted = dehomogenize(self.k * homogeneous(ideal))
            .ok_or_else(|| fail("reprojection failed"))?;

        let plane = dehomogenize(self.homography * homogeneous(undistorted))
            .ok_or_else(|| fail("homography weight is zero or not finite"))?;

        let point = Point3D::planar(plane.x as f32, plane.y as f32);
        if !point.is_finite() {
            return Err(fail("result out of f32 range"));
        }
        Ok(point)
    }
}

fn homogeneous(p: Vector2<f64>) -> Vector3<f64> {
    Vector3::new(p.x, p.y, 1.0)
}

fn dehomogenize(v: Vector3<f64>) -> Option<Vector2<f64>> {
    let w = v.z;
    if !w.is_finite() || w.abs() < MIN_WEIGHT {
        return None;
    }
    let p = Vector2::new(v.x / w, v.y / w);
    (p.x.is_finite() && p.y.is_finite()).then_some(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> [f64; 9] {
        [800.0, 0.0, 320.0, 0.0, 810.0, 240.0, 0.0, 0.0, 1.0]
    }

    #[test]
    fn test_identity_maps_row_col() {
        let t = CalibrationTransform::from_parameters(&CalibrationParameters::identity()).unwrap();
        let p = t.apply(17, 42.5).unwrap();
        assert_eq!(p, Point3D::new(0.0, 42.5, 17.0));
    }

    fn lens() -> BrownConrady {
        BrownConrady::from_coeffs([-0.15, 0.04, 0.0007, -0.0004, 0.0])
    }

    #[test]
    fn test_distorted_sample_lands_on_ideal_pixel() {
        let params = CalibrationParameters::from_slices(
            &camera(),
            &[-0.15, 0.04, 0.0007, -0.0004, 0.0],
            &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        )
        .unwrap();
        let t = CalibrationTransform::from_parameters(&params).unwrap();
        let k = Matrix3::from_row_slice(&camera());
        let k_inv = k.try_inverse().unwrap();

        for &(column, row) in &[(50usize, 100.0f32), (240, 320.0), (400, 500.0)] {
            let p = t.apply(column, row).unwrap();

            // Re-distorting the result must give back the detected pixel
            let n = dehomogenize(k_inv * Vector3::new(p.y as f64, p.z as f64, 1.0)).unwrap();
            let d = dehomogenize(k * homogeneous(lens().distort(n))).unwrap();
            assert!((d.x - row as f64).abs() < 1e-3, "{} vs {}", d.x, row);
            assert!((d.y - column as f64).abs() < 1e-3);
        }
    }

    #[test]
    fn test_undistort_recovers_ideal_pixel() {
        let k = Matrix3::from_row_slice(&camera());
        let k_inv = k.try_inverse().unwrap();
        let ideal = Vector2::new(470.0, 130.0);

        let n = dehomogenize(k_inv * homogeneous(ideal)).unwrap();
        let distorted = dehomogenize(k * homogeneous(lens().distort(n))).unwrap();
        let n_d = dehomogenize(k_inv * homogeneous(distorted)).unwrap();
        let undone = lens().undistort(n_d, UndistortConfig::default()).unwrap();
        let back = dehomogenize(k * homogeneous(undone)).unwrap();

        assert!((back - ideal).norm() < 1e-6);
    }

    #[test]
    fn test_homography_applied() {
        let mut params = CalibrationParameters::identity();
        // Scale by 2, shift z by 5, with w = 2
        params.homography_matrix = [4.0, 0.0, 0.0, 0.0, 4.0, 10.0, 0.0, 0.0, 2.0];
        let t = CalibrationTransform::from_parameters(&params).unwrap();
        let p = t.apply(3, 1.5).unwrap();
        assert_eq!(p, Point3D::new(0.0, 3.0, 11.0));
    }

    #[test]
    fn test_degenerate_homography_fails_sample() {
        let mut params = CalibrationParameters::identity();
        params.homography_matrix = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
        let t = CalibrationTransform::from_parameters(&params).unwrap();
        let err = t.apply(8, 2.0).unwrap_err();
        assert!(matches!(err, ReconError::Transform { column: 8, .. }));
    }

    #[test]
    fn test_wrong_lengths_rejected() {
        let eye = CalibrationParameters::identity();
        let err = CalibrationParameters::from_slices(
            &eye.camera_matrix[..8],
            &eye.distort_coeffs,
            &eye.homography_matrix,
        )
        .unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("camera_matrix needs 9 values, got 8"));

        assert!(CalibrationParameters::from_slices(&eye.camera_matrix, &[0.0; 4], &eye.homography_matrix).is_err());
        assert!(CalibrationParameters::from_slices(&eye.camera_matrix, &eye.distort_coeffs, &[1.0; 10]).is_err());
    }

    #[test]
    fn test_non_finite_and_singular_rejected() {
        let eye = CalibrationParameters::identity();
        let mut bad = eye.distort_coeffs;
        bad[1] = f64::NAN;
        assert!(CalibrationParameters::from_slices(&eye.camera_matrix, &bad, &eye.homography_matrix).is_err());

        let mut params = eye;
        params.camera_matrix = [0.0; 9];
        let err = CalibrationTransform::from_parameters(&params).unwrap_err();
        assert!(matches!(err, ReconError::Configuration(_)));
    }
}
