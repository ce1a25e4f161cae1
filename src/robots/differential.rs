use super::{draw_gain, param_f64, Observation, RobotBehavior, OBS_DIM};
use crate::core::Result;
use crate::registry::KwArgs;
use crate::utils::rng::RngStream;

/// Two-actuator differential drive: wheeled robots, or a boat steered by
/// differential thrust.
///
/// Action: `[left, right]` normalized actuator commands in `[-1, 1]`.
/// A proportional controller drives toward the target bearing first and
/// slows forward speed while the heading error is large.
#[derive(Clone, Debug)]
pub struct DifferentialDrive {
    name: &'static str,
    wheel_radius: f64,
    track_width: f64,
    max_actuator_speed: f64,
    k_lin: f64,
    k_ang: f64,
    gain_noise: f64,
    gain: f64,
}

impl DifferentialDrive {
    fn build(
        name: &'static str,
        wheel_radius: f64,
        track_width: f64,
        max_actuator_speed: f64,
        kwargs: &KwArgs,
    ) -> Result<Self> {
        Ok(Self {
            name,
            wheel_radius,
            track_width,
            max_actuator_speed,
            k_lin: param_f64(kwargs, "k_lin", 1.0)?,
            k_ang: param_f64(kwargs, "k_ang", 2.0)?,
            gain_noise: param_f64(kwargs, "gain_noise", 0.1)?.abs(),
            gain: 1.0,
        })
    }

    pub fn jetbot(kwargs: &KwArgs) -> Result<Self> { Self::build("Jetbot", 0.0325, 0.1125, 20.0, kwargs) }

    pub fn turtlebot2(kwargs: &KwArgs) -> Result<Self> { Self::build("Turtlebot2", 0.035, 0.23, 20.0, kwargs) }

    /// Thrusters modeled as unit-radius "wheels" so commands are thrust ratios.
    pub fn kingfisher(kwargs: &KwArgs) -> Result<Self> { Self::build("Kingfisher", 1.0, 0.74, 2.0, kwargs) }

    pub fn gain(&self) -> f64 { self.gain }
}

impl RobotBehavior for DifferentialDrive {
    fn name(&self) -> &str { self.name }

    fn compute_action(&mut self, observation: &[f64]) -> Vec<f64> {
        let o = Observation(observation);
        let heading = o.heading_error(0.05);
        let align = heading.cos().max(0.0);
        let v = self.gain * self.k_lin * o.distance() * align;
        let w = self.gain * self.k_ang * heading;
        let left = (v - 0.5 * w * self.track_width) / self.wheel_radius;
        let right = (v + 0.5 * w * self.track_width) / self.wheel_radius;
        vec![
            (left / self.max_actuator_speed).clamp(-1.0, 1.0),
            (right / self.max_actuator_speed).clamp(-1.0, 1.0),
        ]
    }

    fn action_dim(&self) -> usize { 2 }
    fn observation_dim(&self) -> usize { OBS_DIM }

    fn reset(&mut self, rng: &mut RngStream) {
        self.gain = draw_gain(rng, self.gain_noise);
    }
}
