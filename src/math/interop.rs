//! Optional conversions to ndarray/nalgebra types.
//!
//! Gated behind the `ndarray` and `nalgebra` features. The crate itself keeps
//! plain arrays (`[f64; 3]` positions, `[w, x, y, z]` quaternions).

#[cfg(feature = "ndarray")]
pub mod ndarray_impl {
    use ndarray::{Array1, Array2};

    use crate::core::{RansError, Result};
    use crate::math::Pose;
    use crate::metrics::RingWindow;
    use crate::track::Track;

    impl Pose {
        /// `[x, y, z, qw, qx, qy, qz]`.
        pub fn to_ndarray(&self) -> Array1<f64> {
            let [x, y, z] = self.position;
            let [w, i, j, k] = self.orientation;
            Array1::from_vec(vec![x, y, z, w, i, j, k])
        }

        /// Inverse of [`Pose::to_ndarray`].
        pub fn from_ndarray(arr: &Array1<f64>) -> Result<Self> {
            if arr.len() != 7 {
                return Err(RansError::InvalidConfig(format!("pose array needs 7 values, got {}", arr.len())));
            }
            Ok(Self {
                position: [arr[0], arr[1], arr[2]],
                orientation: [arr[3], arr[4], arr[5], arr[6]],
            })
        }
    }

    impl Track {
        /// Positions as an `(n, 3)` matrix, one row per point.
        pub fn positions_ndarray(&self) -> Array2<f64> {
            let points = self.points();
            Array2::from_shape_fn((points.len(), 3), |(i, j)| points[i].pose.position[j])
        }

        /// Planar velocities as an `(n, 3)` matrix of `[vx, vy, yaw_rate]`.
        pub fn velocities_ndarray(&self) -> Array2<f64> {
            let points = self.points();
            Array2::from_shape_fn((points.len(), 3), |(i, j)| match j {
                0 | 1 => points[i].linear_velocity[j],
                _ => points[i].angular_velocity,
            })
        }
    }

    impl RingWindow<f64> {
        /// Window contents, oldest first.
        pub fn to_ndarray(&self) -> Array1<f64> { self.iter().copied().collect() }
    }
}

#[cfg(feature = "nalgebra")]
pub mod nalgebra_impl {
    use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion};

    use crate::math::Pose;

    impl Pose {
        /// Rigid transform with the same translation and (normalized) rotation.
        pub fn to_isometry(&self) -> Isometry3<f64> {
            let [x, y, z] = self.position;
            let [w, i, j, k] = self.orientation;
            Isometry3::from_parts(
                Translation3::new(x, y, z),
                UnitQuaternion::from_quaternion(Quaternion::new(w, i, j, k)),
            )
        }

        pub fn from_isometry(iso: &Isometry3<f64>) -> Self {
            let t = iso.translation.vector;
            let q = iso.rotation.quaternion();
            Self { position: [t.x, t.y, t.z], orientation: [q.w, q.i, q.j, q.k] }
        }
    }
}

#[cfg(test)]
mod tests {
    #[cfg(feature = "nalgebra")]
    #[test]
    fn isometry_keeps_yaw() {
        use crate::math::Pose;
        let p = Pose::from_xyz_yaw(1.0, -2.0, 0.5, 0.7);
        let iso = p.to_isometry();
        let (_, _, yaw) = iso.rotation.euler_angles();
        assert!((yaw - 0.7).abs() < 1e-12);
        let back = Pose::from_isometry(&iso);
        assert!((back.yaw() - 0.7).abs() < 1e-12);
        assert_eq!(back.position, p.position);
    }

    #[cfg(feature = "ndarray")]
    #[test]
    fn pose_array_shape_checked() {
        use crate::math::Pose;
        let p = Pose::planar(1.0, 2.0, 0.3);
        let arr = p.to_ndarray();
        assert_eq!(arr.len(), 7);
        assert_eq!(Pose::from_ndarray(&arr).unwrap(), p);
        assert!(Pose::from_ndarray(&ndarray::Array1::zeros(3)).is_err());
    }

    #[cfg(feature = "ndarray")]
    #[test]
    fn window_to_array_oldest_first() {
        let mut w = crate::metrics::RingWindow::new(2);
        for v in [1.0, 2.0, 3.0] {
            w.push(v);
        }
        assert_eq!(w.to_ndarray().to_vec(), vec![2.0, 3.0]);
    }
}
