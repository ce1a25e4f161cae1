// Rolling per-environment evaluation metrics.

use super::running_stats::RunningStats;
use super::window::RingWindow;
use crate::core::{check_env, RansError, Result};
use crate::math::norm;

/// Reduction of one finished episode.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EpisodeSummary {
    pub length: u64,
    /// Mean sample over the episode, 0 for an episode without samples.
    pub mean: f64,
    pub success: bool,
}

/// Metrics state of one environment.
#[derive(Clone, Debug)]
pub struct EnvMetrics {
    env: usize,
    window: RingWindow<f64>,
    cumulative: RunningStats,
    current: RunningStats,
    episode_means: RunningStats,
    episode_lengths: RunningStats,
    episodes: u64,
    successes: u64,
    last_episode: Option<EpisodeSummary>,
}

impl EnvMetrics {
    fn new(env: usize, window: usize) -> Self {
        Self {
            env,
            window: RingWindow::new(window),
            cumulative: RunningStats::new(),
            current: RunningStats::new(),
            episode_means: RunningStats::new(),
            episode_lengths: RunningStats::new(),
            episodes: 0,
            successes: 0,
            last_episode: None,
        }
    }

    pub fn env(&self) -> usize { self.env }

    /// Record one step sample. Non-finite samples are dropped.
    pub fn record_step(&mut self, sample: f64) {
        if !sample.is_finite() {
            log::warn!("env {}: dropping non-finite metric sample {sample}", self.env);
            return;
        }
        self.window.push(sample);
        self.cumulative.update(sample);
        self.current.update(sample);
    }

    /// Close the running episode.
    pub fn record_episode_end(&mut self, success: bool) -> EpisodeSummary {
        let summary = EpisodeSummary { length: self.current.count(), mean: self.current.mean(), success };
        self.episodes += 1;
        if success {
            self.successes += 1;
        }
        if summary.length > 0 {
            self.episode_means.update(summary.mean);
        }
        self.episode_lengths.update(summary.length as f64);
        self.current.reset();
        self.last_episode = Some(summary);
        summary
    }

    /// Clear the window and the running episode; `hard` also clears the
    /// cumulative counters.
    pub fn reset(&mut self, hard: bool) {
        self.window.clear();
        self.current.reset();
        if hard {
            self.cumulative.reset();
            self.episode_means.reset();
            self.episode_lengths.reset();
            self.episodes = 0;
            self.successes = 0;
            self.last_episode = None;
        }
    }

    pub fn episodes(&self) -> u64 { self.episodes }
    pub fn successes(&self) -> u64 { self.successes }

    pub fn success_rate(&self) -> f64 { ratio(self.successes, self.episodes) }

    pub fn summary(&self) -> EnvMetricsSummary {
        let window = self.window.to_vec();
        let window_stats: RunningStats = window.iter().copied().collect();
        EnvMetricsSummary {
            env: self.env,
            episodes: self.episodes,
            successes: self.successes,
            success_rate: self.success_rate(),
            steps: self.cumulative.count(),
            mean: self.cumulative.mean(),
            variance: self.cumulative.variance(),
            window_mean: window_stats.mean(),
            window_variance: window_stats.variance(),
            mean_episode_length: self.episode_lengths.mean(),
            mean_episode_error: self.episode_means.mean(),
            current_episode_steps: self.current.count(),
            last_episode: self.last_episode,
            window,
        }
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Per-environment view returned by [`RollingEvalMetrics::snapshot`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnvMetricsSummary {
    pub env: usize,
    pub episodes: u64,
    pub successes: u64,
    /// successes / episodes, 0 with no episodes.
    pub success_rate: f64,
    /// Samples since the last hard reset.
    pub steps: u64,
    pub mean: f64,
    /// Population variance of all samples since the last hard reset.
    pub variance: f64,
    pub window_mean: f64,
    pub window_variance: f64,
    pub mean_episode_length: f64,
    /// Mean over finished episodes of their mean sample.
    pub mean_episode_error: f64,
    pub current_episode_steps: u64,
    pub last_episode: Option<EpisodeSummary>,
    /// Window contents, oldest first.
    pub window: Vec<f64>,
}

/// Statistics pooled across all environments.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AggregateMetrics {
    pub episodes: u64,
    pub successes: u64,
    pub success_rate: f64,
    pub steps: u64,
    pub mean: f64,
    pub variance: f64,
    pub mean_episode_length: f64,
    pub mean_episode_error: f64,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    pub per_env: Vec<EnvMetricsSummary>,
    pub aggregate: AggregateMetrics,
}

/// Windowed and cumulative evaluation statistics for every environment.
///
/// Environments are fully isolated: recording or resetting one never touches
/// another, so episodes may end at different times per environment.
#[derive(Clone, Debug)]
pub struct RollingEvalMetrics {
    window_capacity: usize,
    envs: Vec<EnvMetrics>,
}

impl RollingEvalMetrics {
    pub fn new(num_envs: usize, window_capacity: usize) -> Result<Self> {
        if window_capacity == 0 {
            return Err(RansError::InvalidConfig("metrics window must be > 0".into()));
        }
        Ok(Self {
            window_capacity,
            envs: (0..num_envs).map(|e| EnvMetrics::new(e, window_capacity)).collect(),
        })
    }

    pub fn num_envs(&self) -> usize { self.envs.len() }
    pub fn window_capacity(&self) -> usize { self.window_capacity }

    pub fn record_step(&mut self, env: usize, sample: f64) -> Result<()> {
        self.env_mut(env)?.record_step(sample);
        Ok(())
    }

    /// Record the Euclidean norm of a vector sample (e.g. a position error).
    pub fn record_step_vector(&mut self, env: usize, sample: &[f64]) -> Result<()> {
        self.record_step(env, norm(sample))
    }

    pub fn record_episode_end(&mut self, env: usize, success: bool) -> Result<EpisodeSummary> {
        Ok(self.env_mut(env)?.record_episode_end(success))
    }

    pub fn reset(&mut self, env: usize, hard: bool) -> Result<()> {
        self.env_mut(env)?.reset(hard);
        Ok(())
    }

    pub fn reset_all(&mut self, hard: bool) {
        for e in &mut self.envs {
            e.reset(hard);
        }
    }

    pub fn env(&self, env: usize) -> Result<&EnvMetrics> {
        check_env(env, self.envs.len())?;
        Ok(&self.envs[env])
    }

    pub fn env_mut(&mut self, env: usize) -> Result<&mut EnvMetrics> {
        check_env(env, self.envs.len())?;
        Ok(&mut self.envs[env])
    }

    /// Disjoint per-environment metric states, for splitting across workers.
    pub fn envs_mut(&mut self) -> &mut [EnvMetrics] { &mut self.envs }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut samples = RunningStats::new();
        let mut episode_means = RunningStats::new();
        let mut episode_lengths = RunningStats::new();
        let (mut episodes, mut successes) = (0u64, 0u64);
        for e in &self.envs {
            samples.merge(&e.cumulative);
            episode_means.merge(&e.episode_means);
            episode_lengths.merge(&e.episode_lengths);
            episodes += e.episodes;
            successes += e.successes;
        }
        MetricsSnapshot {
            per_env: self.envs.iter().map(EnvMetrics::summary).collect(),
            aggregate: AggregateMetrics {
                episodes,
                successes,
                success_rate: ratio(successes, episodes),
                steps: samples.count(),
                mean: samples.mean(),
                variance: samples.variance(),
                mean_episode_length: episode_lengths.mean(),
                mean_episode_error: episode_means.mean(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_rate_defaults_to_zero() {
        let m = RollingEvalMetrics::new(2, 4).unwrap();
        let s = m.snapshot();
        assert_eq!(s.aggregate.success_rate, 0.0);
        assert!(s.per_env.iter().all(|e| e.success_rate == 0.0 && e.window.is_empty()));
    }

    #[test]
    fn success_rate_counts() {
        let mut m = RollingEvalMetrics::new(2, 4).unwrap();
        m.record_episode_end(0, true).unwrap();
        m.record_episode_end(0, false).unwrap();
        m.record_episode_end(0, true).unwrap();
        m.record_episode_end(1, false).unwrap();
        let s = m.snapshot();
        assert!((s.per_env[0].success_rate - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(s.per_env[1].success_rate, 0.0);
        assert_eq!(s.aggregate.episodes, 4);
        assert!((s.aggregate.success_rate - 0.5).abs() < 1e-12);
    }

    #[test]
    fn window_is_bounded_fifo() {
        let mut m = RollingEvalMetrics::new(1, 3).unwrap();
        for x in 1..=5 {
            m.record_step(0, x as f64).unwrap();
        }
        let s = m.snapshot();
        assert_eq!(s.per_env[0].window, vec![3.0, 4.0, 5.0]);
        assert!((s.per_env[0].window_mean - 4.0).abs() < 1e-12);
        assert_eq!(s.per_env[0].steps, 5);
        assert!((s.per_env[0].mean - 3.0).abs() < 1e-12);
        assert!((s.per_env[0].variance - 2.0).abs() < 1e-12);
    }

    #[test]
    fn episode_reductions() {
        let mut m = RollingEvalMetrics::new(1, 8).unwrap();
        for x in [1.0, 2.0, 3.0] {
            m.record_step(0, x).unwrap();
        }
        let ep = m.record_episode_end(0, true).unwrap();
        assert_eq!(ep, EpisodeSummary { length: 3, mean: 2.0, success: true });
        m.record_step(0, 10.0).unwrap();
        m.record_episode_end(0, false).unwrap();
        let s = m.snapshot().per_env.remove(0);
        assert!((s.mean_episode_error - 6.0).abs() < 1e-12);
        assert!((s.mean_episode_length - 2.0).abs() < 1e-12);
        assert_eq!(s.current_episode_steps, 0);
    }

    #[test]
    fn soft_reset_keeps_counters_hard_reset_clears() {
        let mut m = RollingEvalMetrics::new(1, 4).unwrap();
        m.record_step(0, 1.0).unwrap();
        m.record_episode_end(0, true).unwrap();
        m.reset(0, false).unwrap();
        let s = m.snapshot();
        assert!(s.per_env[0].window.is_empty());
        assert_eq!(s.per_env[0].episodes, 1);
        assert_eq!(s.per_env[0].steps, 1);
        m.reset(0, true).unwrap();
        let s = m.snapshot();
        assert_eq!(s.per_env[0].episodes, 0);
        assert_eq!(s.per_env[0].steps, 0);
        assert_eq!(s.per_env[0].last_episode, None);
    }

    #[test]
    fn environments_are_isolated() {
        let mut m = RollingEvalMetrics::new(3, 4).unwrap();
        m.record_step(0, 5.0).unwrap();
        m.record_step(2, -1.0).unwrap();
        m.record_episode_end(2, true).unwrap();
        m.reset(0, true).unwrap();
        let s = m.snapshot();
        assert_eq!(s.per_env[0].steps, 0);
        assert_eq!(s.per_env[1].steps, 0);
        assert_eq!(s.per_env[2].steps, 1);
        assert_eq!(s.per_env[2].episodes, 1);
        assert_eq!(s.aggregate.steps, 1);
        assert!((s.aggregate.mean + 1.0).abs() < 1e-12);
    }

    #[test]
    fn vector_samples_and_bad_input() {
        let mut m = RollingEvalMetrics::new(1, 4).unwrap();
        m.record_step_vector(0, &[3.0, 4.0]).unwrap();
        m.record_step(0, f64::NAN).unwrap();
        let s = m.snapshot();
        assert_eq!(s.per_env[0].window, vec![5.0]);
        assert!(matches!(m.record_step(1, 0.0), Err(RansError::OutOfRange { .. })));
        assert!(RollingEvalMetrics::new(1, 0).is_err());
    }
}
