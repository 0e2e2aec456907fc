//! Brown-Conrady lens distortion in normalized image coordinates.
//!
//! Coefficients follow the usual `[k1, k2, p1, p2, k3]` ordering.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Settings for the fixed-point undistortion loop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UndistortConfig {
    /// Maximum fixed-point iterations
    pub max_iters: usize,
    /// Stop when the update norm drops below this threshold
    pub eps: f64,
}

impl Default for UndistortConfig {
    fn default() -> Self {
        Self {
            max_iters: 20,
            eps: 1e-12,
        }
    }
}

/// Radial (k1, k2, k3) and tangential (p1, p2) distortion
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BrownConrady {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl BrownConrady {
    /// Build from `[k1, k2, p1, p2, k3]`
    pub fn from_coeffs(c: [f64; 5]) -> Self {
        Self {
            k1: c[0],
            k2: c[1],
            p1: c[2],
            p2: c[3],
            k3: c[4],
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    fn radial(&self, r2: f64) -> f64 {
        1.0 + self.k1 * r2 + self.k2 * r2 * r2 + self.k3 * r2 * r2 * r2
    }

    fn tangential(&self, p: Vector2<f64>, r2: f64) -> Vector2<f64> {
        let (x, y) = (p.x, p.y);
        Vector2::new(
            2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x),
            self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y,
        )
    }

    /// Apply distortion to an ideal normalized point
    pub fn distort(&self, p: Vector2<f64>) -> Vector2<f64> {
        let r2 = p.norm_squared();
        p * self.radial(r2) + self.tangential(p, r2)
    }

    /// Invert [`distort`](Self::distort) by fixed-point iteration.
    ///
    /// Stops after `max_iters` steps even if the step never fell below
    /// `eps`, returning the last iterate. Returns `None` only when the
    /// iteration leaves the finite range or the radial factor collapses.
    pub fn undistort(&self, distorted: Vector2<f64>, cfg: UndistortConfig) -> Option<Vector2<f64>> {
        if self.is_identity() {
            return Some(distorted);
        }

        let mut p = distorted;
        for _ in 0..cfg.max_iters.max(1) {
            let r2 = p.norm_squared();
            let radial = self.radial(r2);
            if !radial.is_finite() || radial.abs() < 1e-12 {
                return None;
            }

            let next = (distorted - self.tangential(p, r2)) / radial;
            if !next.x.is_finite() || !next.y.is_finite() {
                return None;
            }

            let step = (next - p).norm();
            p = next;
            if step <= cfg.eps.max(0.0) {
                break;
            }
        }

        Some(p)
    }
}
