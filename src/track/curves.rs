// Procedural curve kinds.
//
// Every kind declares how many uniform [0, 1) draws it needs and builds its
// path from exactly those draws. Paths are parametrized by travelled distance
// and all start at the environment-local origin.

use std::f64::consts::{PI, TAU};

use super::TrackConfig;
use crate::core::{RansError, Result};

/// A planar path parametrized by distance travelled along it.
pub trait PlanarPath {
    /// Position after travelling `s` meters.
    fn position(&self, s: f64) -> [f64; 2];

    /// Direction of travel at `s`, or `None` where the path is stationary.
    fn heading(&self, s: f64) -> Option<f64> {
        const EPS: f64 = 1e-6;
        let a = self.position(s);
        let b = self.position(s + EPS);
        let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
        if dx * dx + dy * dy > 1e-18 {
            return Some(dy.atan2(dx));
        }
        if s >= EPS {
            let p = self.position(s - EPS);
            let (dx, dy) = (a[0] - p[0], a[1] - p[1]);
            if dx * dx + dy * dy > 1e-18 {
                return Some(dy.atan2(dx));
            }
        }
        None
    }
}

/// A procedural curve family selectable by name.
pub trait CurveKind: Send + Sync {
    fn name(&self) -> &'static str;

    /// Exact number of uniform draws `build` consumes for this config.
    fn draw_count(&self, config: &TrackConfig) -> usize;

    /// Reject parameters that would produce a degenerate curve.
    fn validate(&self, config: &TrackConfig) -> Result<()>;

    /// Build the path. `draws.len() == self.draw_count(config)`.
    fn build(&self, config: &TrackConfig, draws: &[f64]) -> Result<Box<dyn PlanarPath>>;
}

/// Names of every built-in curve kind.
pub const CURVE_KINDS: [&str; 4] = [
    StraightLine::NAME,
    CircularArc::NAME,
    FigureEight::NAME,
    WaypointSpline::NAME,
];

/// Look up a curve kind by name.
pub fn curve_kind(name: &str) -> Result<Box<dyn CurveKind>> {
    match name {
        StraightLine::NAME => Ok(Box::new(StraightLine)),
        CircularArc::NAME => Ok(Box::new(CircularArc)),
        FigureEight::NAME => Ok(Box::new(FigureEight)),
        WaypointSpline::NAME => Ok(Box::new(WaypointSpline)),
        other => Err(RansError::InvalidTrackConfig(format!("unknown curve kind: {other}"))),
    }
}

fn jittered(nominal: f64, jitter: f64, u: f64) -> f64 {
    nominal * (1.0 + jitter * (2.0 * u - 1.0))
}

fn check_radius(config: &TrackConfig) -> Result<()> {
    if !(config.radius.is_finite() && config.radius > 0.0) {
        return Err(RansError::InvalidTrackConfig(format!("radius must be > 0, got {}", config.radius)));
    }
    Ok(())
}

/// Constant heading from the origin. Draws: heading.
#[derive(Clone, Copy, Debug, Default)]
pub struct StraightLine;

impl StraightLine {
    pub const NAME: &'static str = "straight_line";
}

struct Ray {
    dir: [f64; 2],
}

impl PlanarPath for Ray {
    fn position(&self, s: f64) -> [f64; 2] { [s * self.dir[0], s * self.dir[1]] }
    fn heading(&self, _s: f64) -> Option<f64> { Some(self.dir[1].atan2(self.dir[0])) }
}

impl CurveKind for StraightLine {
    fn name(&self) -> &'static str { Self::NAME }
    fn draw_count(&self, _config: &TrackConfig) -> usize { 1 }
    fn validate(&self, _config: &TrackConfig) -> Result<()> { Ok(()) }

    fn build(&self, _config: &TrackConfig, draws: &[f64]) -> Result<Box<dyn PlanarPath>> {
        let heading = -PI + TAU * draws[0];
        Ok(Box::new(Ray { dir: [heading.cos(), heading.sin()] }))
    }
}

/// Circle through the origin, traversed from it.
/// Draws: radius jitter, initial phase, turning direction (`< 0.5` is counter-clockwise).
#[derive(Clone, Copy, Debug, Default)]
pub struct CircularArc;

impl CircularArc {
    pub const NAME: &'static str = "circular_arc";
}

struct Circle {
    center: [f64; 2],
    radius: f64,
    phase: f64,
    dir: f64,
}

impl PlanarPath for Circle {
    fn position(&self, s: f64) -> [f64; 2] {
        let a = self.phase + self.dir * s / self.radius;
        [self.center[0] + self.radius * a.cos(), self.center[1] + self.radius * a.sin()]
    }

    fn heading(&self, s: f64) -> Option<f64> {
        let a = self.phase + self.dir * s / self.radius;
        Some(crate::math::wrap_angle(a + self.dir * 0.5 * PI))
    }
}

impl CurveKind for CircularArc {
    fn name(&self) -> &'static str { Self::NAME }
    fn draw_count(&self, _config: &TrackConfig) -> usize { 3 }
    fn validate(&self, config: &TrackConfig) -> Result<()> { check_radius(config) }

    fn build(&self, config: &TrackConfig, draws: &[f64]) -> Result<Box<dyn PlanarPath>> {
        let radius = jittered(config.radius, config.radius_jitter, draws[0]);
        if radius <= 0.0 {
            return Err(RansError::InvalidTrackConfig(format!("jittered radius {radius} <= 0")));
        }
        let phase = TAU * draws[1];
        let dir = if draws[2] < 0.5 { 1.0 } else { -1.0 };
        let center = [-radius * phase.cos(), -radius * phase.sin()];
        Ok(Box::new(Circle { center, radius, phase, dir }))
    }
}

/// Dense polyline sampled by arc length.
struct Polyline {
    points: Vec<[f64; 2]>,
    cumulative: Vec<f64>,
    periodic: bool,
}

impl Polyline {
    fn new(points: Vec<[f64; 2]>, periodic: bool) -> Self {
        let mut cumulative = Vec::with_capacity(points.len());
        let mut acc = 0.0;
        cumulative.push(0.0);
        for w in points.windows(2) {
            acc += ((w[1][0] - w[0][0]).powi(2) + (w[1][1] - w[0][1]).powi(2)).sqrt();
            cumulative.push(acc);
        }
        Self { points, cumulative, periodic }
    }

    fn length(&self) -> f64 { self.cumulative.last().copied().unwrap_or(0.0) }

    /// Wrapped or clamped distance and the segment `(lo, lo + 1)` containing it.
    fn locate(&self, s: f64) -> (f64, usize) {
        let total = self.length();
        let s = if self.periodic { s.rem_euclid(total) } else { s.clamp(0.0, total) };
        // first index whose cumulative length exceeds s
        let hi = self.cumulative.partition_point(|&c| c <= s).min(self.points.len() - 1).max(1);
        (s, hi - 1)
    }
}

impl PlanarPath for Polyline {
    fn heading(&self, s: f64) -> Option<f64> {
        if self.length() <= 0.0 {
            return None;
        }
        let (_, seg) = self.locate(s);
        // nearest non-degenerate segment at or before `seg`
        (0..=seg).rev().find_map(|lo| {
            let (a, b) = (self.points[lo], self.points[lo + 1]);
            let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
            (dx * dx + dy * dy > 1e-18).then(|| dy.atan2(dx))
        })
    }

    fn position(&self, s: f64) -> [f64; 2] {
        if self.length() <= 0.0 {
            return self.points[0];
        }
        let (s, lo) = self.locate(s);
        let hi = lo + 1;
        let seg = self.cumulative[hi] - self.cumulative[lo];
        let f = if seg > 0.0 { (s - self.cumulative[lo]) / seg } else { 0.0 };
        let (a, b) = (self.points[lo], self.points[hi]);
        [a[0] + f * (b[0] - a[0]), a[1] + f * (b[1] - a[1])]
    }
}

/// Samples per curve segment when densifying parametric curves.
const DENSE_SAMPLES: usize = 64;

/// Upper bound on `TrackConfig::num_waypoints`.
pub const MAX_WAYPOINTS: usize = 4096;

/// Lemniscate of Gerono through the origin, looped.
/// Draws: size jitter, orientation.
#[derive(Clone, Copy, Debug, Default)]
pub struct FigureEight;

impl FigureEight {
    pub const NAME: &'static str = "figure_eight";
}

impl CurveKind for FigureEight {
    fn name(&self) -> &'static str { Self::NAME }
    fn draw_count(&self, _config: &TrackConfig) -> usize { 2 }
    fn validate(&self, config: &TrackConfig) -> Result<()> { check_radius(config) }

    fn build(&self, config: &TrackConfig, draws: &[f64]) -> Result<Box<dyn PlanarPath>> {
        let a = jittered(config.radius, config.radius_jitter, draws[0]);
        if a <= 0.0 {
            return Err(RansError::InvalidTrackConfig(format!("jittered size {a} <= 0")));
        }
        let rot = -PI + TAU * draws[1];
        let (c, s) = (rot.cos(), rot.sin());
        let n = 4 * DENSE_SAMPLES;
        let points = (0..=n)
            .map(|i| {
                let th = TAU * i as f64 / n as f64;
                let (x, y) = (a * th.sin(), a * th.sin() * th.cos());
                [c * x - s * y, s * x + c * y]
            })
            .collect();
        Ok(Box::new(Polyline::new(points, true)))
    }
}

/// Catmull-Rom spline from the origin through randomly placed waypoints.
///
/// Draws: `x` for every waypoint, then `y` for every waypoint, then one
/// ordering key per waypoint. Ordering is shuffle-then-order: waypoints are
/// visited by ascending key, equal keys by ascending draw index. The pose
/// holds at the last waypoint once the spline is exhausted.
#[derive(Clone, Copy, Debug, Default)]
pub struct WaypointSpline;

impl WaypointSpline {
    pub const NAME: &'static str = "waypoint_spline";

    /// Visiting order of waypoints given their keys.
    pub fn visit_order(keys: &[f64]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..keys.len()).collect();
        order.sort_by(|&a, &b| keys[a].total_cmp(&keys[b]).then(a.cmp(&b)));
        order
    }
}

fn catmull_rom(p0: [f64; 2], p1: [f64; 2], p2: [f64; 2], p3: [f64; 2], t: f64) -> [f64; 2] {
    let t2 = t * t;
    let t3 = t2 * t;
    let f = |a: f64, b: f64, c: f64, d: f64| {
        0.5 * (2.0 * b + (c - a) * t + (2.0 * a - 5.0 * b + 4.0 * c - d) * t2 + (3.0 * b - a - 3.0 * c + d) * t3)
    };
    [f(p0[0], p1[0], p2[0], p3[0]), f(p0[1], p1[1], p2[1], p3[1])]
}

impl CurveKind for WaypointSpline {
    fn name(&self) -> &'static str { Self::NAME }
    fn draw_count(&self, config: &TrackConfig) -> usize { config.num_waypoints.saturating_mul(3) }

    fn validate(&self, config: &TrackConfig) -> Result<()> {
        if config.num_waypoints < 2 {
            return Err(RansError::InvalidTrackConfig(format!(
                "waypoint spline needs >= 2 waypoints, got {}",
                config.num_waypoints
            )));
        }
        if config.num_waypoints > MAX_WAYPOINTS {
            return Err(RansError::InvalidTrackConfig(format!(
                "waypoint spline takes at most {MAX_WAYPOINTS} waypoints, got {}",
                config.num_waypoints
            )));
        }
        if !(config.area_half_extent.is_finite() && config.area_half_extent > 0.0) {
            return Err(RansError::InvalidTrackConfig(format!(
                "area half extent must be > 0, got {}",
                config.area_half_extent
            )));
        }
        Ok(())
    }

    fn build(&self, config: &TrackConfig, draws: &[f64]) -> Result<Box<dyn PlanarPath>> {
        let n = config.num_waypoints;
        let ext = config.area_half_extent;
        let (xs, rest) = draws.split_at(n);
        let (ys, keys) = rest.split_at(n);
        let mut ctrl = Vec::with_capacity(n + 1);
        ctrl.push([0.0, 0.0]);
        for i in Self::visit_order(keys) {
            ctrl.push([ext * (2.0 * xs[i] - 1.0), ext * (2.0 * ys[i] - 1.0)]);
        }
        let last = ctrl.len() - 1;
        let at = |i: isize| ctrl[i.clamp(0, last as isize) as usize];
        let mut points = Vec::with_capacity(last * DENSE_SAMPLES + 1);
        for seg in 0..last as isize {
            for k in 0..DENSE_SAMPLES {
                let t = k as f64 / DENSE_SAMPLES as f64;
                points.push(catmull_rom(at(seg - 1), at(seg), at(seg + 1), at(seg + 2), t));
            }
        }
        points.push(ctrl[last]);
        Ok(Box::new(Polyline::new(points, false)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name() {
        for name in CURVE_KINDS {
            assert_eq!(curve_kind(name).unwrap().name(), name);
        }
        assert!(matches!(curve_kind("spiral"), Err(RansError::InvalidTrackConfig(_))));
    }

    #[test]
    fn every_path_starts_at_origin() {
        let config = TrackConfig::default();
        for name in CURVE_KINDS {
            let kind = curve_kind(name).unwrap();
            let draws = vec![0.3; kind.draw_count(&config)];
            let path = kind.build(&config, &draws).unwrap();
            let p = path.position(0.0);
            assert!(p[0].abs() < 1e-9 && p[1].abs() < 1e-9, "{name} starts at {p:?}");
        }
    }

    #[test]
    fn circle_keeps_constant_radius() {
        let config = TrackConfig { radius: 2.0, radius_jitter: 0.0, ..TrackConfig::default() };
        let path = CircularArc.build(&config, &[0.5, 0.25, 0.9]).unwrap();
        let center = [0.0, -2.0];
        for i in 0..20 {
            let p = path.position(i as f64 * 0.7);
            let r = ((p[0] - center[0]).powi(2) + (p[1] - center[1]).powi(2)).sqrt();
            assert!((r - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn straight_line_travels_at_unit_rate() {
        let path = StraightLine.build(&TrackConfig::default(), &[0.75]).unwrap();
        let p = path.position(3.0);
        assert!(((p[0] * p[0] + p[1] * p[1]).sqrt() - 3.0).abs() < 1e-12);
        assert!((path.heading(1.0).unwrap() - 0.5 * PI).abs() < 1e-12);
    }

    #[test]
    fn visit_order_breaks_ties_by_index() {
        assert_eq!(WaypointSpline::visit_order(&[0.5, 0.1, 0.5, 0.0]), vec![3, 1, 0, 2]);
    }

    #[test]
    fn spline_passes_waypoints_and_holds_at_end() {
        let config = TrackConfig { num_waypoints: 2, area_half_extent: 1.0, ..TrackConfig::default() };
        // waypoints (1, 0) and (0, 1), visited in reverse draw order
        let draws = [1.0, 0.5, 0.5, 1.0, 0.9, 0.1];
        let path = WaypointSpline.build(&config, &draws).unwrap();
        let end = path.position(1e6);
        assert!((end[0] - 1.0).abs() < 1e-12 && end[1].abs() < 1e-12);
        assert!(path.heading(1e6).is_some());
    }

    #[test]
    fn degenerate_configs_rejected() {
        let bad_radius = TrackConfig { radius: 0.0, ..TrackConfig::default() };
        assert!(CircularArc.validate(&bad_radius).is_err());
        assert!(FigureEight.validate(&bad_radius).is_err());
        let one_wp = TrackConfig { num_waypoints: 1, ..TrackConfig::default() };
        assert!(WaypointSpline.validate(&one_wp).is_err());
        let no_area = TrackConfig { area_half_extent: -1.0, ..TrackConfig::default() };
        assert!(WaypointSpline.validate(&no_area).is_err());
        let huge = TrackConfig { num_waypoints: usize::MAX / 2, ..TrackConfig::default() };
        assert!(WaypointSpline.validate(&huge).is_err());
        assert_eq!(WaypointSpline.draw_count(&huge), usize::MAX);
        let at_cap = TrackConfig { num_waypoints: MAX_WAYPOINTS, ..TrackConfig::default() };
        assert!(WaypointSpline.validate(&at_cap).is_ok());
    }
}
