//! Background job sweeping expired login state.
//!
//! Codes and rate windows expire logically on their own; this sweep just
//! keeps the in-memory maps from accumulating dead entries.

use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use super::scheduler::{Job, JobFrequency};
use crate::services::otp::OtpStore;
use crate::services::rate_limit::RateLimitStore;

/// Job that removes expired one-time codes and lapsed rate windows.
pub struct CleanupAuthJob {
    otp_stores: Vec<Arc<dyn OtpStore>>,
    rate_store: Arc<dyn RateLimitStore>,
}

impl CleanupAuthJob {
    pub fn new(
        otp_stores: Vec<Arc<dyn OtpStore>>,
        rate_store: Arc<dyn RateLimitStore>,
    ) -> Self {
        Self {
            otp_stores,
            rate_store,
        }
    }
}

#[async_trait::async_trait]
impl Job for CleanupAuthJob {
    fn name(&self) -> &'static str {
        "cleanup_auth"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(5)
    }

    async fn execute(&self) -> Result<(), String> {
        let now = Utc::now();

        let mut codes_removed = 0;
        for store in &self.otp_stores {
            codes_removed += store.sweep_expired(now);
        }
        let windows_removed = self.rate_store.sweep_expired(now);

        debug!(
            codes_removed = codes_removed,
            windows_removed = windows_removed,
            "Swept expired login state"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::otp::{InMemoryOtpStore, OtpService};
    use crate::services::rate_limit::{FixedWindowLimiter, InMemoryRateLimitStore};

    #[tokio::test]
    async fn test_execute_sweeps_expired_entries() {
        let otp_store = Arc::new(InMemoryOtpStore::new());
        let rate_store = Arc::new(InMemoryRateLimitStore::new());

        // One already-expired code and one lapsed window
        OtpService::new(otp_store.clone(), -1, 5).issue("old@example.com");
        FixedWindowLimiter::new(rate_store.clone(), 5, -1)
            .hit("old-key")
            .unwrap();

        let job = CleanupAuthJob::new(
            vec![otp_store.clone() as Arc<dyn OtpStore>],
            rate_store.clone(),
        );
        job.execute().await.unwrap();

        assert!(otp_store.is_empty());
        assert_eq!(rate_store.len(), 0);
    }

    #[test]
    fn test_job_identity() {
        let job = CleanupAuthJob::new(vec![], Arc::new(InMemoryRateLimitStore::new()));
        assert_eq!(job.name(), "cleanup_auth");
        assert!(matches!(job.frequency(), JobFrequency::Minutes(5)));
    }
}
