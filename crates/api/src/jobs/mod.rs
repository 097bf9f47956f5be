//! Background job scheduler and job implementations.

mod cleanup_auth;
mod pool_metrics;
mod scheduler;

pub use cleanup_auth::CleanupAuthJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::JobScheduler;
