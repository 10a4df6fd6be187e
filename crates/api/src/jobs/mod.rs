//! Background job scheduler and job implementations.

mod pool_metrics;
mod reset_daily_counters;
mod scheduler;

pub use pool_metrics::PoolMetricsJob;
pub use reset_daily_counters::ResetDailyCountersJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
