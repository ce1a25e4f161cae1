//! Procedural reference trajectories.
//!
//! A [`Track`] is a finite, strictly time-ordered sequence of [`TrackPoint`]s
//! sampled every `step_dt` seconds along a curve drawn from one of the
//! [`curves`] kinds. Generation consumes a fixed number of uniform draws from
//! the caller's stream (see [`CurveKind::draw_count`]) and depends on nothing
//! else, so identical inputs give identical tracks.

pub mod curves;

use std::io::Write;

use rand::Rng;

use crate::core::{check_env, RansError, Result};
use crate::math::{wrap_angle, Pose};

pub use curves::{curve_kind, CurveKind, PlanarPath, CURVE_KINDS, MAX_WAYPOINTS};

/// Upper bound on the number of points in one track.
pub const MAX_TRACK_POINTS: usize = 1 << 24;

/// Curve and sampling parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackConfig {
    /// Interval between consecutive points (simulation dt times decimation).
    pub step_dt: f64,
    /// Travel speed along the curve, m/s.
    pub speed: f64,
    /// Nominal radius for arcs and the figure-eight half-width.
    pub radius: f64,
    /// Relative radius perturbation in `[0, 1)`.
    pub radius_jitter: f64,
    pub num_waypoints: usize,
    /// Waypoints are drawn from `[-e, e]^2`.
    pub area_half_extent: f64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            step_dt: 6.0 / 60.0,
            speed: 0.5,
            radius: 2.0,
            radius_jitter: 0.2,
            num_waypoints: 5,
            area_half_extent: 3.0,
        }
    }
}

impl TrackConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(RansError::InvalidTrackConfig(format!("{name} must be > 0, got {v}")))
            }
        };
        positive("step_dt", self.step_dt)?;
        positive("speed", self.speed)?;
        if !(0.0..1.0).contains(&self.radius_jitter) {
            return Err(RansError::InvalidTrackConfig(format!(
                "radius_jitter must be in [0, 1), got {}",
                self.radius_jitter
            )));
        }
        Ok(())
    }
}

/// How far a track extends.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrackExtent {
    /// Seconds of travel.
    Duration(f64),
    /// Meters of travel at the configured speed.
    Length(f64),
}

impl TrackExtent {
    pub fn duration(&self, speed: f64) -> Result<f64> {
        let d = match *self {
            TrackExtent::Duration(d) => d,
            TrackExtent::Length(l) => l / speed,
        };
        if d.is_finite() && d > 0.0 {
            Ok(d)
        } else {
            Err(RansError::InvalidTrackConfig(format!("degenerate track extent {self:?}")))
        }
    }
}

/// One sample along a track.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackPoint {
    pub step: usize,
    pub time: f64,
    pub pose: Pose,
    /// Planar world-frame velocity.
    pub linear_velocity: [f64; 2],
    /// Yaw rate.
    pub angular_velocity: f64,
}

/// A generated reference trajectory for one environment episode.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Track {
    env: usize,
    kind: String,
    step_dt: f64,
    total_length: f64,
    points: Vec<TrackPoint>,
}

impl Track {
    pub fn env(&self) -> usize { self.env }
    pub fn kind(&self) -> &str { &self.kind }
    pub fn step_dt(&self) -> f64 { self.step_dt }
    /// Length of the sampled polyline.
    pub fn total_length(&self) -> f64 { self.total_length }
    pub fn points(&self) -> &[TrackPoint] { &self.points }
    pub fn len(&self) -> usize { self.points.len() }
    pub fn is_empty(&self) -> bool { self.points.is_empty() }

    pub fn duration(&self) -> f64 {
        self.points.last().map(|p| p.time).unwrap_or(0.0)
    }

    /// Point for a control step; the last point once the track is exhausted.
    pub fn point_at_step(&self, step: usize) -> Option<&TrackPoint> {
        self.points.get(step).or(self.points.last())
    }

    /// Index of, and planar distance to, the closest point to `xy`.
    /// Ties go to the earlier point.
    pub fn closest_point(&self, xy: [f64; 2]) -> Option<(usize, f64)> {
        self.points
            .iter()
            .map(|p| {
                let d = ((p.pose.position[0] - xy[0]).powi(2) + (p.pose.position[1] - xy[1]).powi(2)).sqrt();
                (p.step, d)
            })
            .fold(None, |best, cur| match best {
                Some((_, bd)) if bd <= cur.1 => best,
                _ => Some(cur),
            })
    }

    /// Same track shifted into world coordinates.
    pub fn translated(&self, origin: [f64; 3]) -> Track {
        let mut out = self.clone();
        for p in &mut out.points {
            p.pose = p.pose.translated(origin);
        }
        out
    }

    /// Write the track as CSV rows under trajectory id `trajectory`.
    /// The header is written only when `header` is set.
    pub fn write_csv<W: Write>(&self, w: &mut W, trajectory: usize, header: bool) -> std::io::Result<()> {
        if header {
            writeln!(w, "trajectory,step,time,x,y,yaw,linear_velocity_x,linear_velocity_y,angular_velocity_z")?;
        }
        for p in &self.points {
            writeln!(
                w,
                "{},{},{},{},{},{},{},{},{}",
                trajectory,
                p.step,
                p.time,
                p.pose.position[0],
                p.pose.position[1],
                p.pose.yaw(),
                p.linear_velocity[0],
                p.linear_velocity[1],
                p.angular_velocity
            )?;
        }
        Ok(())
    }
}

/// Builds tracks for environments in `[0, num_envs)`.
#[derive(Clone, Debug)]
pub struct TrackGenerator {
    num_envs: usize,
}

impl TrackGenerator {
    pub fn new(num_envs: usize) -> Self { Self { num_envs } }

    pub fn num_envs(&self) -> usize { self.num_envs }

    /// Generate a track of curve kind `kind` for `env`.
    ///
    /// Consumes exactly `curve_kind(kind)?.draw_count(config)` values from
    /// `rng` on success and none when the configuration is rejected.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        env: usize,
        rng: &mut R,
        kind: &str,
        extent: TrackExtent,
        config: &TrackConfig,
    ) -> Result<Track> {
        check_env(env, self.num_envs)?;
        let curve = curve_kind(kind)?;
        config.validate()?;
        curve.validate(config)?;
        let duration = extent.duration(config.speed)?;
        let steps = duration / config.step_dt;
        if steps < 1.0 - 1e-9 {
            return Err(RansError::InvalidTrackConfig(format!(
                "duration {duration} shorter than one step ({})",
                config.step_dt
            )));
        }
        if !(steps < MAX_TRACK_POINTS as f64) {
            return Err(RansError::InvalidTrackConfig(format!(
                "duration {duration} at step {} exceeds {MAX_TRACK_POINTS} points",
                config.step_dt
            )));
        }
        let num_points = (steps + 1e-9).floor() as usize + 1;

        let draws: Vec<f64> = (0..curve.draw_count(config)).map(|_| rng.r#gen::<f64>()).collect();
        let path = curve.build(config, &draws)?;

        let mut points = Vec::with_capacity(num_points);
        let mut yaw = path.heading(0.0).unwrap_or(0.0);
        for step in 0..num_points {
            let time = step as f64 * config.step_dt;
            let s = config.speed * time;
            let [x, y] = path.position(s);
            if let Some(h) = path.heading(s) {
                yaw = h;
            }
            points.push(TrackPoint {
                step,
                time,
                pose: Pose::planar(x, y, yaw),
                linear_velocity: [0.0; 2],
                angular_velocity: 0.0,
            });
        }
        fill_velocities(&mut points, config.step_dt);

        let total_length = points
            .windows(2)
            .map(|w| {
                let (a, b) = (w[0].pose.position, w[1].pose.position);
                ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2)).sqrt()
            })
            .sum();
        log::debug!("env {env}: generated {kind} track, {num_points} points, {total_length:.3} m");

        Ok(Track { env, kind: curve.name().to_string(), step_dt: config.step_dt, total_length, points })
    }
}

/// Finite-difference velocities: forward at the first point, backward at the
/// last, central elsewhere.
fn fill_velocities(points: &mut [TrackPoint], dt: f64) {
    let n = points.len();
    if n < 2 {
        return;
    }
    for i in 0..n {
        let (a, b) = match i {
            0 => (0, 1),
            _ if i == n - 1 => (n - 2, n - 1),
            _ => (i - 1, i + 1),
        };
        let span = (b - a) as f64 * dt;
        let (pa, pb) = (points[a].pose, points[b].pose);
        points[i].linear_velocity = [
            (pb.position[0] - pa.position[0]) / span,
            (pb.position[1] - pa.position[1]) / span,
        ];
        points[i].angular_velocity = wrap_angle(pb.yaw() - pa.yaw()) / span;
    }
}
