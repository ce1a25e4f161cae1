use super::{draw_gain, param_f64, Observation, RobotBehavior, OBS_DIM};
use crate::core::Result;
use crate::registry::KwArgs;
use crate::utils::rng::RngStream;

/// Car-like robot with front-wheel steering.
///
/// Action: `[throttle, steering]`, both normalized to `[-1, 1]`. Steering
/// follows a pure-pursuit arc to the target; throttle is proportional to the
/// distance ahead, damped by the current forward speed.
#[derive(Clone, Debug)]
pub struct AckermannCar {
    name: &'static str,
    wheelbase: f64,
    max_steering: f64,
    max_speed: f64,
    k_throttle: f64,
    k_damp: f64,
    gain_noise: f64,
    gain: f64,
}

impl AckermannCar {
    pub fn leatherback(kwargs: &KwArgs) -> Result<Self> {
        Ok(Self {
            name: "Leatherback",
            wheelbase: 0.32,
            max_steering: 0.75,
            max_speed: param_f64(kwargs, "max_speed", 2.0)?,
            k_throttle: param_f64(kwargs, "k_throttle", 1.0)?,
            k_damp: param_f64(kwargs, "k_damp", 0.2)?,
            gain_noise: param_f64(kwargs, "gain_noise", 0.1)?.abs(),
            gain: 1.0,
        })
    }
}

impl RobotBehavior for AckermannCar {
    fn name(&self) -> &str { self.name }

    fn compute_action(&mut self, observation: &[f64]) -> Vec<f64> {
        let o = Observation(observation);
        let d2 = o.err_x() * o.err_x() + o.err_y() * o.err_y();
        // pure pursuit curvature toward the target point
        let curvature = if d2 > 1e-9 { 2.0 * o.err_y() / d2 } else { 0.0 };
        let steering = (self.wheelbase * curvature).atan() / self.max_steering;
        let speed = self.gain * self.k_throttle * o.err_x() - self.k_damp * o.vel_x();
        vec![(speed / self.max_speed).clamp(-1.0, 1.0), steering.clamp(-1.0, 1.0)]
    }

    fn action_dim(&self) -> usize { 2 }
    fn observation_dim(&self) -> usize { OBS_DIM }

    fn reset(&mut self, rng: &mut RngStream) {
        self.gain = draw_gain(rng, self.gain_noise);
    }
}
