//! Poses and small planar geometry helpers shared by the pool and track generator.

pub mod interop;

use std::f64::consts::PI;

/// A rigid pose: position plus unit quaternion orientation `[w, x, y, z]`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    pub position: [f64; 3],
    pub orientation: [f64; 4],
}

impl Default for Pose {
    fn default() -> Self { Self::identity() }
}

impl Pose {
    pub fn identity() -> Self {
        Self { position: [0.0; 3], orientation: [1.0, 0.0, 0.0, 0.0] }
    }

    /// Pose at `(x, y, z)` rotated by `yaw` about +z.
    pub fn from_xyz_yaw(x: f64, y: f64, z: f64, yaw: f64) -> Self {
        let half = 0.5 * yaw;
        Self { position: [x, y, z], orientation: [half.cos(), 0.0, 0.0, half.sin()] }
    }

    pub fn planar(x: f64, y: f64, yaw: f64) -> Self { Self::from_xyz_yaw(x, y, 0.0, yaw) }

    /// Heading about +z recovered from the quaternion.
    pub fn yaw(&self) -> f64 {
        let [w, x, y, z] = self.orientation;
        (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z))
    }

    /// Same orientation, position shifted by `offset`.
    pub fn translated(&self, offset: [f64; 3]) -> Self {
        let p = self.position;
        Self { position: [p[0] + offset[0], p[1] + offset[1], p[2] + offset[2]], orientation: self.orientation }
    }
}

/// Wrap an angle into `[-pi, pi)`.
#[inline]
pub fn wrap_angle(x: f64) -> f64 {
    (x + PI).rem_euclid(2.0 * PI) - PI
}

/// Euclidean norm of a slice.
#[inline]
pub fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// World origins of `num_envs` environments laid out on a square grid,
/// centered on the world origin, `spacing` apart.
pub fn grid_origins(num_envs: usize, spacing: f64) -> Vec<[f64; 3]> {
    if num_envs == 0 {
        return Vec::new();
    }
    let cols = (num_envs as f64).sqrt().ceil() as usize;
    let rows = num_envs.div_ceil(cols);
    let x0 = (rows as f64 - 1.0) * 0.5;
    let y0 = (cols as f64 - 1.0) * 0.5;
    (0..num_envs)
        .map(|i| {
            let (r, c) = (i / cols, i % cols);
            [(x0 - r as f64) * spacing, (c as f64 - y0) * spacing, 0.0]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaw_round_trips_through_quaternion() {
        for &yaw in &[0.0, 0.5, -1.2, 3.0, -3.0] {
            let p = Pose::planar(1.0, 2.0, yaw);
            assert!((p.yaw() - yaw).abs() < 1e-12, "yaw {yaw} -> {}", p.yaw());
        }
    }

    #[test]
    fn wrap_angle_range() {
        assert!((wrap_angle(3.0 * PI) + PI).abs() < 1e-12);
        assert!((wrap_angle(0.25) - 0.25).abs() < 1e-12);
        assert!(wrap_angle(-7.0) >= -PI && wrap_angle(-7.0) < PI);
    }

    #[test]
    fn grid_origins_are_centered_and_spaced() {
        let o = grid_origins(4, 7.5);
        assert_eq!(o.len(), 4);
        let cx: f64 = o.iter().map(|p| p[0]).sum::<f64>() / 4.0;
        let cy: f64 = o.iter().map(|p| p[1]).sum::<f64>() / 4.0;
        assert!(cx.abs() < 1e-12 && cy.abs() < 1e-12);
        assert!(((o[0][1] - o[1][1]).abs() - 7.5).abs() < 1e-12);
        assert!(grid_origins(0, 1.0).is_empty());
        assert_eq!(grid_origins(5, 1.0).len(), 5);
    }
}
