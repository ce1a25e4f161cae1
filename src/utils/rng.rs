//! Deterministic per-environment RNG streams.
//!
//! This module provides:
//! - Channel: a named purpose for random draws ("track", "object-placement", ...)
//! - derive: a reproducible ChaCha8 stream for one (master seed, env, channel)
//! - RngBank: the arena of all `num_envs x channels` streams for a run
//! - Draw: uniform / integer / normal draws on any RNG
//!
//! Stream keys mix the master seed with a stable FNV-1a hash of the channel name
//! through SplitMix64 finalizers. The environment index picks the ChaCha stream
//! number under that key, so environments never share a keystream.

use rand::distributions::{Distribution, Uniform};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::Normal;

use crate::core::{check_env, RansError, Result};

/// Type alias for the RNG stream used across the crate.
pub type RngStream = ChaCha8Rng;

/// A named logical purpose for random draws.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Channel(String);

impl Channel {
    pub const TRACK: &'static str = "track";
    pub const OBJECT_PLACEMENT: &'static str = "object-placement";
    pub const ROBOT: &'static str = "robot";

    pub fn new<S: Into<String>>(name: S) -> Self { Self(name.into()) }

    pub fn name(&self) -> &str { &self.0 }

    /// The channels every vectorized run uses.
    pub fn builtin() -> Vec<Channel> {
        vec![Self::new(Self::TRACK), Self::new(Self::OBJECT_PLACEMENT), Self::new(Self::ROBOT)]
    }
}

impl From<&str> for Channel {
    fn from(v: &str) -> Self { Channel::new(v) }
}

/// SplitMix64 finalizer.
#[inline]
fn mix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E3779B97F4A7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// FNV-1a over the channel name. Stable across processes and toolchains,
/// unlike `std`'s `DefaultHasher`.
fn channel_hash(name: &str) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for b in name.as_bytes() {
        h ^= *b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

/// Key seed for all streams of one channel under one master seed.
pub fn channel_seed(master_seed: u64, channel: &str) -> u64 {
    mix64(mix64(master_seed) ^ channel_hash(channel))
}

/// Derive the stream for `(master_seed, env, channel)`.
///
/// Same inputs always give the same future draws.
pub fn derive(master_seed: u64, env: usize, channel: &str) -> RngStream {
    let mut rng = RngStream::seed_from_u64(channel_seed(master_seed, channel));
    rng.set_stream(env as u64);
    rng
}

/// Uniform, integer and normal draws with validated parameters.
///
/// Each call consumes a fixed number of words from the stream except
/// `draw_int`, whose rejection sampling may take more than one.
pub trait Draw: Rng {
    /// Uniform float in `[low, high]` from one `[0, 1)` draw. The width
    /// `high - low` must be finite.
    fn draw_uniform(&mut self, low: f64, high: f64) -> Result<f64> {
        let width = high - low;
        if !(low.is_finite() && high.is_finite()) || low > high || !width.is_finite() {
            return Err(RansError::InvalidDistribution(format!("uniform [{low}, {high}]")));
        }
        Ok((low + width * self.r#gen::<f64>()).min(high))
    }

    /// Uniform integer in `[low, high]`.
    fn draw_int(&mut self, low: i64, high: i64) -> Result<i64> {
        if low > high {
            return Err(RansError::InvalidDistribution(format!("int [{low}, {high}]")));
        }
        Ok(Uniform::new_inclusive(low, high).sample(self))
    }

    /// Gaussian draw with the given mean and standard deviation.
    fn draw_normal(&mut self, mean: f64, std: f64) -> Result<f64> {
        let dist = Normal::new(mean, std)
            .map_err(|e| RansError::InvalidDistribution(format!("normal({mean}, {std}): {e}")))?;
        Ok(dist.sample(self))
    }
}

impl<R: Rng + ?Sized> Draw for R {}

/// The streams owned by one environment, one per bank channel.
#[derive(Clone, Debug)]
pub struct EnvStreams {
    env: usize,
    channels: std::sync::Arc<[Channel]>,
    streams: Vec<RngStream>,
}

impl EnvStreams {
    pub fn env(&self) -> usize { self.env }

    /// Stream for `channel`, or `UnknownChannel`.
    pub fn stream_mut(&mut self, channel: &str) -> Result<&mut RngStream> {
        let idx = self
            .channels
            .iter()
            .position(|c| c.name() == channel)
            .ok_or_else(|| RansError::UnknownChannel(channel.to_string()))?;
        Ok(&mut self.streams[idx])
    }
}

/// Arena of independent streams indexed by `(env, channel)`.
///
/// Drawing from one stream never touches another, so disjoint environments
/// can be driven from separate threads via [`RngBank::env_streams_mut`].
#[derive(Clone, Debug)]
pub struct RngBank {
    master_seed: u64,
    channels: std::sync::Arc<[Channel]>,
    envs: Vec<EnvStreams>,
}

impl RngBank {
    pub fn new(master_seed: u64, num_envs: usize, channels: Vec<Channel>) -> Result<Self> {
        if channels.is_empty() {
            return Err(RansError::InvalidConfig("RngBank needs at least one channel".into()));
        }
        for (i, c) in channels.iter().enumerate() {
            if channels[..i].contains(c) {
                return Err(RansError::InvalidConfig(format!("duplicate channel {}", c.name())));
            }
        }
        let channels: std::sync::Arc<[Channel]> = channels.into();
        let envs = (0..num_envs)
            .map(|env| EnvStreams {
                env,
                channels: channels.clone(),
                streams: channels.iter().map(|c| derive(master_seed, env, c.name())).collect(),
            })
            .collect();
        Ok(Self { master_seed, channels, envs })
    }

    /// Bank with the built-in channels.
    pub fn with_builtin_channels(master_seed: u64, num_envs: usize) -> Result<Self> {
        Self::new(master_seed, num_envs, Channel::builtin())
    }

    pub fn master_seed(&self) -> u64 { self.master_seed }
    pub fn num_envs(&self) -> usize { self.envs.len() }
    pub fn channels(&self) -> &[Channel] { &self.channels }

    /// Stream for `(env, channel)`.
    pub fn stream_mut(&mut self, env: usize, channel: &str) -> Result<&mut RngStream> {
        check_env(env, self.envs.len())?;
        self.envs[env].stream_mut(channel)
    }

    /// All streams of one environment.
    pub fn env_mut(&mut self, env: usize) -> Result<&mut EnvStreams> {
        check_env(env, self.envs.len())?;
        Ok(&mut self.envs[env])
    }

    /// Disjoint per-environment views, for splitting across workers.
    pub fn env_streams_mut(&mut self) -> &mut [EnvStreams] { &mut self.envs }

    /// Re-derive one environment's streams from the master seed.
    pub fn reseed_env(&mut self, env: usize) -> Result<()> {
        check_env(env, self.envs.len())?;
        let master = self.master_seed;
        let slot = &mut self.envs[env];
        for (stream, c) in slot.streams.iter_mut().zip(self.channels.iter()) {
            *stream = derive(master, env, c.name());
        }
        Ok(())
    }

    /// Run `f` on every environment's streams in parallel.
    #[cfg(feature = "parallel")]
    pub fn par_for_each_env<F>(&mut self, f: F)
    where
        F: Fn(&mut EnvStreams) + Send + Sync,
    {
        use rayon::prelude::*;
        self.envs.par_iter_mut().for_each(|e| f(e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    #[test]
    fn derive_is_deterministic() {
        let mut a = derive(12345, 3, Channel::TRACK);
        let mut b = derive(12345, 3, Channel::TRACK);
        for _ in 0..16 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        let mut c = derive(12346, 3, Channel::TRACK);
        assert_ne!(derive(12345, 3, Channel::TRACK).next_u64(), c.next_u64());
    }

    #[test]
    fn envs_and_channels_get_distinct_streams() {
        let first = |env, ch| derive(7, env, ch).next_u64();
        assert_ne!(first(0, Channel::TRACK), first(1, Channel::TRACK));
        assert_ne!(first(0, Channel::TRACK), first(0, Channel::OBJECT_PLACEMENT));
    }

    #[test]
    fn bank_rejects_bad_env_and_channel() {
        let mut bank = RngBank::with_builtin_channels(1, 2).unwrap();
        assert!(matches!(bank.stream_mut(2, Channel::TRACK), Err(RansError::OutOfRange { index: 2, num_envs: 2 })));
        assert!(matches!(bank.stream_mut(0, "weather"), Err(RansError::UnknownChannel(_))));
        assert!(RngBank::new(1, 2, vec![]).is_err());
        assert!(RngBank::new(1, 2, vec!["a".into(), "a".into()]).is_err());
    }

    #[test]
    fn bank_stream_matches_derive() {
        let mut bank = RngBank::with_builtin_channels(99, 4).unwrap();
        let mut direct = derive(99, 2, Channel::ROBOT);
        let s = bank.stream_mut(2, Channel::ROBOT).unwrap();
        assert_eq!(s.next_u64(), direct.next_u64());
    }

    #[test]
    fn reseed_restarts_the_sequence() {
        let mut bank = RngBank::with_builtin_channels(5, 1).unwrap();
        let first = bank.stream_mut(0, Channel::TRACK).unwrap().next_u64();
        bank.stream_mut(0, Channel::TRACK).unwrap().next_u64();
        bank.reseed_env(0).unwrap();
        assert_eq!(bank.stream_mut(0, Channel::TRACK).unwrap().next_u64(), first);
    }

    #[test]
    fn draws_respect_bounds_and_validate() {
        let mut rng = derive(0, 0, Channel::TRACK);
        for _ in 0..200 {
            let u = rng.draw_uniform(-2.0, 3.0).unwrap();
            assert!((-2.0..=3.0).contains(&u));
            let i = rng.draw_int(1, 6).unwrap();
            assert!((1..=6).contains(&i));
        }
        assert_eq!(rng.draw_uniform(1.5, 1.5).unwrap(), 1.5);
        assert!(rng.draw_uniform(1.0, 0.0).is_err());
        assert!(rng.draw_int(2, 1).is_err());
        assert!(rng.draw_normal(0.0, -1.0).is_err());
        assert!(rng.draw_normal(0.0, 1.0).unwrap().is_finite());
    }

    #[test]
    fn uniform_rejects_overflowing_width() {
        let mut rng = derive(1, 0, Channel::TRACK);
        assert!(matches!(rng.draw_uniform(-f64::MAX, f64::MAX), Err(RansError::InvalidDistribution(_))));
        assert!(matches!(rng.draw_uniform(-1e308, 1e308), Err(RansError::InvalidDistribution(_))));
        assert!(rng.draw_uniform(0.0, f64::MAX).unwrap().is_finite());
    }
}
