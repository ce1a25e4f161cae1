//! Robot behaviors constructed through the registry.
//!
//! Built-in behaviors share one observation layout, in the robot body frame:
//! `[err_x, err_y, err_yaw, vel_x, vel_y, yaw_rate]` where `err` is target
//! minus current. Actions are normalized actuator commands.

pub mod ackermann;
pub mod differential;
pub mod thrusters;

use rand::Rng;

use crate::core::{RansError, Result};
use crate::registry::{factory_of, KwArgs, RobotRegistry};
use crate::utils::rng::RngStream;

pub use ackermann::AckermannCar;
pub use differential::DifferentialDrive;
pub use thrusters::ThrusterPlatform;

/// Length of the shared observation vector.
pub const OBS_DIM: usize = 6;

/// Capability set every registered robot provides.
pub trait RobotBehavior: Send {
    fn name(&self) -> &str;

    /// Map an observation to an actuator command of length `action_dim()`.
    fn compute_action(&mut self, observation: &[f64]) -> Vec<f64>;

    fn action_dim(&self) -> usize;

    fn observation_dim(&self) -> usize;

    /// Start a new episode, drawing any per-episode randomization from `rng`.
    fn reset(&mut self, rng: &mut RngStream);
}

/// Named view over the shared observation layout. Missing entries read as 0.
#[derive(Clone, Copy, Debug)]
pub struct Observation<'a>(pub &'a [f64]);

impl Observation<'_> {
    fn at(&self, i: usize) -> f64 { self.0.get(i).copied().unwrap_or(0.0) }
    pub fn err_x(&self) -> f64 { self.at(0) }
    pub fn err_y(&self) -> f64 { self.at(1) }
    pub fn err_yaw(&self) -> f64 { self.at(2) }
    pub fn vel_x(&self) -> f64 { self.at(3) }
    pub fn vel_y(&self) -> f64 { self.at(4) }
    pub fn yaw_rate(&self) -> f64 { self.at(5) }

    pub fn distance(&self) -> f64 { self.err_x().hypot(self.err_y()) }

    /// Bearing to the target, or the yaw error once within `tol` of it.
    pub fn heading_error(&self, tol: f64) -> f64 {
        if self.distance() > tol { self.err_y().atan2(self.err_x()) } else { self.err_yaw() }
    }
}

/// Parse an optional float parameter.
pub fn param_f64(kwargs: &KwArgs, key: &str, default: f64) -> Result<f64> {
    match kwargs.get(key) {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|x| x.is_finite())
            .ok_or_else(|| RansError::InvalidConfig(format!("robot parameter {key}={v:?} is not a finite number"))),
    }
}

/// Multiplicative gain perturbation in `[1 - noise, 1 + noise]`. One draw.
pub(crate) fn draw_gain(rng: &mut RngStream, noise: f64) -> f64 {
    1.0 + noise * (2.0 * rng.r#gen::<f64>() - 1.0)
}

/// Names of the built-in robots.
pub const BUILTIN_ROBOTS: [&str; 6] = [
    "Jetbot",
    "Turtlebot2",
    "Kingfisher",
    "Leatherback",
    "FloatingPlatform",
    "ModularFreeflyer",
];

/// Register every built-in robot.
pub fn register_builtin(registry: &mut RobotRegistry) -> Result<()> {
    registry.register("Jetbot", factory_of(DifferentialDrive::jetbot))?;
    registry.register("Turtlebot2", factory_of(DifferentialDrive::turtlebot2))?;
    registry.register("Kingfisher", factory_of(DifferentialDrive::kingfisher))?;
    registry.register("Leatherback", factory_of(AckermannCar::leatherback))?;
    registry.register("FloatingPlatform", factory_of(ThrusterPlatform::floating_platform))?;
    registry.register("ModularFreeflyer", factory_of(ThrusterPlatform::modular_freeflyer))?;
    Ok(())
}
