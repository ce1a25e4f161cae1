// Named scalar accumulators reported through the `log` facade.

use std::collections::BTreeMap;

use crate::core::{check_env, Result};
use crate::metrics::RunningStats;

/// Per-environment episodic sums of named scalars (reward terms, errors, ...).
///
/// Values accumulate per environment while an episode runs. When an episode
/// ends, [`ScalarLogger::finish_episode`] moves that environment's sums into a
/// cross-environment statistic; [`ScalarLogger::flush`] then reports the mean
/// of every scalar over the episodes finished since the previous flush.
#[derive(Clone, Debug)]
pub struct ScalarLogger {
    num_envs: usize,
    running: BTreeMap<String, Vec<f64>>,
    finished: BTreeMap<String, RunningStats>,
}

impl ScalarLogger {
    pub fn new(num_envs: usize) -> Self {
        Self { num_envs, running: BTreeMap::new(), finished: BTreeMap::new() }
    }

    pub fn num_envs(&self) -> usize { self.num_envs }

    /// Add `value` to scalar `name` of `env`. Names are created on first use.
    pub fn add(&mut self, name: &str, env: usize, value: f64) -> Result<()> {
        check_env(env, self.num_envs)?;
        if !value.is_finite() {
            log::warn!("env {env}: dropping non-finite value {value} for scalar {name}");
            return Ok(());
        }
        if !self.running.contains_key(name) {
            self.running.insert(name.to_string(), vec![0.0; self.num_envs]);
        }
        if let Some(sums) = self.running.get_mut(name) {
            sums[env] += value;
        }
        Ok(())
    }

    /// Current (unfinished) episode sum of `name` for `env`.
    pub fn current(&self, name: &str, env: usize) -> Result<f64> {
        check_env(env, self.num_envs)?;
        Ok(self.running.get(name).map_or(0.0, |s| s[env]))
    }

    /// Close the running episode of `env`, feeding its sums into the report.
    pub fn finish_episode(&mut self, env: usize) -> Result<()> {
        check_env(env, self.num_envs)?;
        for (name, sums) in &mut self.running {
            self.finished.entry(name.clone()).or_default().update(sums[env]);
            sums[env] = 0.0;
        }
        Ok(())
    }

    /// Drop the running sums of `env` without reporting them.
    pub fn discard(&mut self, env: usize) -> Result<()> {
        check_env(env, self.num_envs)?;
        for sums in self.running.values_mut() {
            sums[env] = 0.0;
        }
        Ok(())
    }

    /// Episodes finished since the last flush.
    pub fn pending_episodes(&self) -> u64 {
        self.finished.values().map(RunningStats::count).max().unwrap_or(0)
    }

    /// Mean per-episode sum of every scalar since the last flush, logged at
    /// `info` level. Running episodes are left untouched.
    pub fn flush(&mut self) -> BTreeMap<String, f64> {
        let report: BTreeMap<String, f64> = std::mem::take(&mut self.finished)
            .into_iter()
            .map(|(name, stats)| (name, stats.mean()))
            .collect();
        for (name, mean) in &report {
            log::info!("episode/{name}: {mean:.6}");
        }
        report
    }
}
