//! Run configuration consumed by [`crate::vector::VecEnvCore`].
//!
//! Everything arrives as one value at construction; nothing here reads
//! environment variables or files. With the `serde` feature the struct can be
//! deserialized from whatever format the caller's config layer uses.

use crate::core::{RansError, Result};
use crate::pool::PlacementBounds;
use crate::registry::KwArgs;
use crate::track::{curve_kind, TrackConfig};

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VecEnvConfig {
    pub num_envs: usize,
    pub master_seed: u64,
    /// Distance between neighbouring environment origins.
    pub env_spacing: f64,
    /// Physics step, seconds.
    pub sim_dt: f64,
    /// Physics steps per control step.
    pub decimation: u32,
    pub episode_length_s: f64,
    pub robot_name: String,
    pub robot_kwargs: KwArgs,
    pub task_name: String,
    pub track_kind: String,
    /// Curve parameters. `step_dt` is overridden by `sim_dt * decimation`.
    pub track: TrackConfig,
    /// Object slots per environment.
    pub object_capacity: usize,
    /// Objects acquired and randomly placed at every reset.
    pub objects_per_reset: usize,
    pub object_bounds: PlacementBounds,
    pub metrics_window: usize,
}

impl Default for VecEnvConfig {
    fn default() -> Self {
        Self {
            num_envs: 4096,
            master_seed: 42,
            env_spacing: 7.5,
            sim_dt: 1.0 / 60.0,
            decimation: 6,
            episode_length_s: 20.0,
            robot_name: "FloatingPlatform".into(),
            robot_kwargs: KwArgs::new(),
            task_name: "GoToPose".into(),
            track_kind: "waypoint_spline".into(),
            track: TrackConfig::default(),
            object_capacity: 4,
            objects_per_reset: 0,
            object_bounds: PlacementBounds::square(3.0),
            metrics_window: 256,
        }
    }
}

impl VecEnvConfig {
    /// Control interval.
    pub fn step_dt(&self) -> f64 { self.sim_dt * self.decimation as f64 }

    /// Control steps per episode, rounded up.
    pub fn max_episode_steps(&self) -> u64 {
        (self.episode_length_s / self.step_dt() - 1e-9).ceil().max(0.0) as u64
    }

    /// Track parameters with the control interval applied.
    pub fn track_config(&self) -> TrackConfig {
        TrackConfig { step_dt: self.step_dt(), ..self.track.clone() }
    }

    pub fn validate(&self) -> Result<()> {
        let bad = |msg: String| Err(RansError::InvalidConfig(msg));
        if self.num_envs == 0 {
            return bad("num_envs must be > 0".into());
        }
        if !(self.sim_dt.is_finite() && self.sim_dt > 0.0) || self.decimation == 0 {
            return bad(format!("invalid control interval: sim_dt {} x decimation {}", self.sim_dt, self.decimation));
        }
        if !(self.episode_length_s.is_finite() && self.episode_length_s > 0.0) {
            return bad(format!("episode_length_s must be > 0, got {}", self.episode_length_s));
        }
        if !(self.env_spacing.is_finite() && self.env_spacing >= 0.0) {
            return bad(format!("env_spacing must be >= 0, got {}", self.env_spacing));
        }
        if self.object_capacity == 0 {
            return bad("object_capacity must be > 0".into());
        }
        if self.objects_per_reset > self.object_capacity {
            return bad(format!(
                "objects_per_reset {} exceeds object_capacity {}",
                self.objects_per_reset, self.object_capacity
            ));
        }
        if let Err(e) = self.object_bounds.validate() {
            return bad(format!("object bounds: {e}"));
        }
        if self.metrics_window == 0 {
            return bad("metrics_window must be > 0".into());
        }
        let track = self.track_config();
        track.validate()?;
        curve_kind(&self.track_kind)?.validate(&track)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = VecEnvConfig::default();
        c.validate().unwrap();
        assert!((c.step_dt() - 0.1).abs() < 1e-12);
        assert_eq!(c.max_episode_steps(), 200);
        assert!((c.track_config().step_dt - 0.1).abs() < 1e-12);
    }

    #[test]
    fn rejects_degenerate_values() {
        let base = VecEnvConfig::default();
        let cases = [
            VecEnvConfig { num_envs: 0, ..base.clone() },
            VecEnvConfig { decimation: 0, ..base.clone() },
            VecEnvConfig { episode_length_s: 0.0, ..base.clone() },
            VecEnvConfig { object_capacity: 0, ..base.clone() },
            VecEnvConfig { objects_per_reset: 5, ..base.clone() },
            VecEnvConfig { metrics_window: 0, ..base.clone() },
            VecEnvConfig { object_bounds: PlacementBounds { low: [1.0, 0.0, 0.0], high: [0.0, 1.0, 0.0], yaw: (0.0, 1.0) }, ..base.clone() },
        ];
        for c in cases {
            assert!(matches!(c.validate(), Err(RansError::InvalidConfig(_))), "{c:?}");
        }
        let bad_track = VecEnvConfig { track_kind: "spiral".into(), ..base.clone() };
        assert!(matches!(bad_track.validate(), Err(RansError::InvalidTrackConfig(_))));
        let bad_radius = VecEnvConfig {
            track_kind: "circular_arc".into(),
            track: TrackConfig { radius: 0.0, ..TrackConfig::default() },
            ..base
        };
        assert!(matches!(bad_radius.validate(), Err(RansError::InvalidTrackConfig(_))));
    }
}
