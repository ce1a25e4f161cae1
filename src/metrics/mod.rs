pub mod eval_metrics;
pub mod running_stats;
pub mod window;

pub use eval_metrics::{AggregateMetrics, EnvMetrics, EnvMetricsSummary, EpisodeSummary, MetricsSnapshot, RollingEvalMetrics};
pub use running_stats::RunningStats;
pub use window::RingWindow;
