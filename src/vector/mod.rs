// Vectorized per-environment bookkeeping driven by an external simulation loop.

use crate::config::VecEnvConfig;
use crate::core::{check_env, RansError, Result};
use crate::logger::ScalarLogger;
use crate::math::{grid_origins, wrap_angle, Pose};
use crate::metrics::{EpisodeSummary, MetricsSnapshot, RollingEvalMetrics};
use crate::pool::{ObjectSlot, ObjectStoragePool};
use crate::registry::{self, RobotRegistry};
use crate::robots::{RobotBehavior, OBS_DIM};
use crate::track::{Track, TrackConfig, TrackExtent, TrackGenerator, TrackPoint};
use crate::utils::rng::{Channel, RngBank};

/// Scalar name under which [`VecEnvCore::record_step`] logs tracking errors.
pub const TRACKING_ERROR: &str = "tracking_error";

/// Owns every per-environment component of a run: RNG streams, object pool,
/// current tracks, robot behaviors, metrics and scalar logs.
///
/// - Construct with `VecEnvCore::new(config, &registry)`; every environment
///   is reset once before `new` returns.
/// - Each control step: build observations with [`VecEnvCore::observation`],
///   get actions from [`VecEnvCore::compute_actions`], report errors with
///   [`VecEnvCore::record_step`].
/// - End an episode with [`VecEnvCore::end_episode`], which also resets it.
pub struct VecEnvCore {
    config: VecEnvConfig,
    track_config: TrackConfig,
    origins: Vec<[f64; 3]>,
    rng: RngBank,
    pool: ObjectStoragePool,
    generator: TrackGenerator,
    tracks: Vec<Track>,
    placed: Vec<Vec<ObjectSlot>>,
    episode_steps: Vec<u64>,
    robots: Vec<Box<dyn RobotBehavior>>,
    metrics: RollingEvalMetrics,
    logger: ScalarLogger,
}

impl std::fmt::Debug for VecEnvCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VecEnvCore")
            .field("num_envs", &self.num_envs())
            .field("robot", &self.config.robot_name)
            .field("task", &self.config.task_name)
            .field("track_kind", &self.config.track_kind)
            .finish()
    }
}

impl VecEnvCore {
    pub fn new(config: VecEnvConfig, registry: &RobotRegistry) -> Result<Self> {
        config.validate()?;
        let n = config.num_envs;
        let robots = (0..n)
            .map(|_| registry.create(&config.robot_name, &config.robot_kwargs))
            .collect::<Result<Vec<_>>>()?;
        let mut core = Self {
            track_config: config.track_config(),
            origins: grid_origins(n, config.env_spacing),
            rng: RngBank::with_builtin_channels(config.master_seed, n)?,
            pool: ObjectStoragePool::new(n, config.object_capacity)?,
            generator: TrackGenerator::new(n),
            tracks: Vec::with_capacity(n),
            placed: vec![Vec::new(); n],
            episode_steps: vec![0; n],
            robots,
            metrics: RollingEvalMetrics::new(n, config.metrics_window)?,
            logger: ScalarLogger::new(n),
            config,
        };
        for env in 0..n {
            let track = core.reset_env(env)?;
            core.tracks.push(track);
        }
        log::info!(
            "{} envs ready: robot {}, task {}, {} tracks, seed {}",
            n,
            core.config.robot_name,
            core.config.task_name,
            core.config.track_kind,
            core.config.master_seed
        );
        Ok(core)
    }

    /// Build against the process-wide registry (built-in robots unless one was installed).
    pub fn from_global_registry(config: VecEnvConfig) -> Result<Self> {
        Self::new(config, registry::global_or_builtin())
    }

    pub fn num_envs(&self) -> usize { self.config.num_envs }
    pub fn config(&self) -> &VecEnvConfig { &self.config }

    /// World-frame origin of every environment.
    pub fn origins(&self) -> &[[f64; 3]] { &self.origins }

    /// Start a fresh episode in each of `envs`.
    ///
    /// Per environment, in order: the object pool is recycled, a track is
    /// drawn from the `track` channel, `objects_per_reset` objects are placed
    /// from the `object-placement` channel, the robot is reset from the
    /// `robot` channel and the metrics window is soft-reset. All indices are
    /// checked before anything is touched.
    pub fn reset_envs(&mut self, envs: &[usize]) -> Result<()> {
        for &env in envs {
            check_env(env, self.num_envs())?;
        }
        for &env in envs {
            self.tracks[env] = self.reset_env(env)?;
        }
        Ok(())
    }

    pub fn reset_all(&mut self) -> Result<()> {
        let all: Vec<usize> = (0..self.num_envs()).collect();
        self.reset_envs(&all)
    }

    fn reset_env(&mut self, env: usize) -> Result<Track> {
        self.pool.reset_environment(env)?;
        let streams = self.rng.env_mut(env)?;
        let track = self.generator.generate(
            env,
            streams.stream_mut(Channel::TRACK)?,
            &self.config.track_kind,
            TrackExtent::Duration(self.config.episode_length_s),
            &self.track_config,
        )?;
        let placed = &mut self.placed[env];
        placed.clear();
        for _ in 0..self.config.objects_per_reset {
            let slot = self.pool.acquire(env)?;
            self.pool.place_random(slot, streams.stream_mut(Channel::OBJECT_PLACEMENT)?, &self.config.object_bounds)?;
            placed.push(slot);
        }
        self.robots[env].reset(streams.stream_mut(Channel::ROBOT)?);
        self.metrics.reset(env, false)?;
        self.logger.discard(env)?;
        self.episode_steps[env] = 0;
        log::debug!("env {env}: reset, {} points, {} objects", track.len(), placed.len());
        Ok(track)
    }

    /// Current track of `env`, environment-local.
    pub fn track(&self, env: usize) -> Result<&Track> {
        check_env(env, self.num_envs())?;
        Ok(&self.tracks[env])
    }

    /// Current track of `env` shifted to its world origin.
    pub fn world_track(&self, env: usize) -> Result<Track> {
        Ok(self.track(env)?.translated(self.origins[env]))
    }

    /// Track point the robot should be at for the current episode step,
    /// holding the last point once the track is exhausted.
    pub fn target(&self, env: usize) -> Result<&TrackPoint> {
        let track = self.track(env)?;
        let step = (self.episode_steps[env] as usize).min(track.len().saturating_sub(1));
        track
            .point_at_step(step)
            .ok_or_else(|| RansError::InvalidTrackConfig(format!("env {env}: empty track")))
    }

    /// Body-frame observation `[err_x, err_y, err_yaw, vel_x, vel_y, yaw_rate]`
    /// of a robot at world pose `pose` with world velocity `[vx, vy, yaw_rate]`.
    pub fn observation(&self, env: usize, pose: &Pose, velocity: [f64; 3]) -> Result<Vec<f64>> {
        let target = self.target(env)?;
        let origin = self.origins[env];
        let dx = target.pose.position[0] + origin[0] - pose.position[0];
        let dy = target.pose.position[1] + origin[1] - pose.position[1];
        let yaw = pose.yaw();
        let (s, c) = yaw.sin_cos();
        let mut obs = Vec::with_capacity(OBS_DIM);
        obs.push(c * dx + s * dy);
        obs.push(-s * dx + c * dy);
        obs.push(wrap_angle(target.pose.yaw() - yaw));
        obs.push(c * velocity[0] + s * velocity[1]);
        obs.push(-s * velocity[0] + c * velocity[1]);
        obs.push(velocity[2]);
        Ok(obs)
    }

    /// One action per environment. `observations.len()` must equal `num_envs`.
    pub fn compute_actions(&mut self, observations: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        self.check_batch(observations.len())?;
        Ok(self.robots.iter_mut().zip(observations).map(|(r, o)| r.compute_action(o)).collect())
    }

    /// Same as [`VecEnvCore::compute_actions`], spread over the rayon pool.
    #[cfg(feature = "parallel")]
    pub fn par_compute_actions(&mut self, observations: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        use rayon::prelude::*;
        self.check_batch(observations.len())?;
        Ok(self.robots.par_iter_mut().zip(observations.par_iter()).map(|(r, o)| r.compute_action(o)).collect())
    }

    fn check_batch(&self, len: usize) -> Result<()> {
        if len != self.num_envs() {
            return Err(RansError::InvalidConfig(format!("expected {} observations, got {len}", self.num_envs())));
        }
        Ok(())
    }

    pub fn robot(&self, env: usize) -> Result<&dyn RobotBehavior> {
        check_env(env, self.num_envs())?;
        Ok(self.robots[env].as_ref())
    }

    /// Record the tracking error of one control step and advance the episode clock.
    pub fn record_step(&mut self, env: usize, tracking_error: f64) -> Result<()> {
        self.metrics.record_step(env, tracking_error)?;
        self.logger.add(TRACKING_ERROR, env, tracking_error)?;
        self.episode_steps[env] += 1;
        Ok(())
    }

    /// Vector error variant of [`VecEnvCore::record_step`], reduced to its norm.
    pub fn record_step_vector(&mut self, env: usize, error: &[f64]) -> Result<()> {
        self.record_step(env, crate::math::norm(error))
    }

    /// Control steps taken in the current episode of `env`.
    pub fn episode_step(&self, env: usize) -> Result<u64> {
        check_env(env, self.num_envs())?;
        Ok(self.episode_steps[env])
    }

    /// Whether `env` has reached the configured episode length.
    pub fn is_timed_out(&self, env: usize) -> Result<bool> {
        Ok(self.episode_step(env)? >= self.config.max_episode_steps())
    }

    /// Close the episode of `env`, then reset it.
    pub fn end_episode(&mut self, env: usize, success: bool) -> Result<EpisodeSummary> {
        let summary = self.metrics.record_episode_end(env, success)?;
        self.logger.finish_episode(env)?;
        self.reset_envs(&[env])?;
        Ok(summary)
    }

    /// Objects placed at the last reset of `env`.
    pub fn placed_objects(&self, env: usize) -> Result<&[ObjectSlot]> {
        check_env(env, self.num_envs())?;
        Ok(&self.placed[env])
    }

    pub fn pool(&self) -> &ObjectStoragePool { &self.pool }
    pub fn pool_mut(&mut self) -> &mut ObjectStoragePool { &mut self.pool }
    pub fn rng_mut(&mut self) -> &mut RngBank { &mut self.rng }
    pub fn metrics(&self) -> &RollingEvalMetrics { &self.metrics }
    pub fn logger_mut(&mut self) -> &mut ScalarLogger { &mut self.logger }

    pub fn snapshot(&self) -> MetricsSnapshot { self.metrics.snapshot() }
}
