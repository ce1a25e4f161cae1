use std::f64::consts::FRAC_PI_4;

use super::{draw_gain, param_f64, Observation, RobotBehavior, OBS_DIM};
use crate::core::Result;
use crate::registry::KwArgs;
use crate::utils::rng::RngStream;

/// Planar free-floating body actuated by eight on/off thrusters, two per
/// corner firing tangentially in opposite directions.
///
/// Action: one entry per thruster, `0.0` (off) or `1.0` (on). A PD law
/// produces a desired body-frame force and torque; a thruster fires when its
/// contribution along that wrench exceeds `threshold`.
#[derive(Clone, Debug)]
pub struct ThrusterPlatform {
    name: &'static str,
    /// Corner distance from the center.
    arm: f64,
    /// (force direction x, force direction y, torque) per thruster.
    layout: Vec<[f64; 3]>,
    kp: f64,
    kd: f64,
    k_yaw: f64,
    threshold: f64,
    gain_noise: f64,
    gain: f64,
}

impl ThrusterPlatform {
    fn build(name: &'static str, arm: f64, kwargs: &KwArgs) -> Result<Self> {
        let layout = (0..8)
            .map(|i| {
                let corner = FRAC_PI_4 + (i / 2) as f64 * 2.0 * FRAC_PI_4;
                let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
                [-sign * corner.sin(), sign * corner.cos(), sign * arm]
            })
            .collect();
        Ok(Self {
            name,
            arm,
            layout,
            kp: param_f64(kwargs, "kp", 1.0)?,
            kd: param_f64(kwargs, "kd", 0.5)?,
            k_yaw: param_f64(kwargs, "k_yaw", 0.5)?,
            threshold: param_f64(kwargs, "threshold", 0.1)?,
            gain_noise: param_f64(kwargs, "gain_noise", 0.1)?.abs(),
            gain: 1.0,
        })
    }

    pub fn floating_platform(kwargs: &KwArgs) -> Result<Self> { Self::build("FloatingPlatform", 0.31, kwargs) }

    pub fn modular_freeflyer(kwargs: &KwArgs) -> Result<Self> { Self::build("ModularFreeflyer", 0.2, kwargs) }

    pub fn arm(&self) -> f64 { self.arm }
}

impl RobotBehavior for ThrusterPlatform {
    fn name(&self) -> &str { self.name }

    fn compute_action(&mut self, observation: &[f64]) -> Vec<f64> {
        let o = Observation(observation);
        let fx = self.gain * (self.kp * o.err_x() - self.kd * o.vel_x());
        let fy = self.gain * (self.kp * o.err_y() - self.kd * o.vel_y());
        let tz = self.gain * (self.k_yaw * o.err_yaw() - self.kd * o.yaw_rate());
        self.layout
            .iter()
            .map(|t| {
                let score = t[0] * fx + t[1] * fy + t[2] * tz;
                if score > self.threshold { 1.0 } else { 0.0 }
            })
            .collect()
    }

    fn action_dim(&self) -> usize { self.layout.len() }
    fn observation_dim(&self) -> usize { OBS_DIM }

    fn reset(&mut self, rng: &mut RngStream) {
        self.gain = draw_gain(rng, self.gain_noise);
    }
}
