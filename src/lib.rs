pub mod core;
pub mod utils;
pub mod math;
pub mod pool;
pub mod track;
pub mod metrics;
pub mod robots;
pub mod registry;
pub mod config;
pub mod logger;
pub mod vector;

pub use crate::core::{RansError, Result};
pub use crate::utils::{derive, Channel, Draw, RngBank, RngStream};
pub use crate::math::Pose;
pub use crate::pool::{ObjectSlot, ObjectStoragePool, PlacementBounds};
pub use crate::track::{Track, TrackConfig, TrackExtent, TrackGenerator, TrackPoint};
pub use crate::metrics::{EpisodeSummary, MetricsSnapshot, RollingEvalMetrics, RunningStats};
pub use crate::robots::RobotBehavior;
pub use crate::registry::{KwArgs, RobotRegistry};
pub use crate::config::VecEnvConfig;
pub use crate::logger::ScalarLogger;
pub use crate::vector::VecEnvCore;
