use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

use crate::{
    github::{GitHub, RateStatus},
    settings::Pacing,
};

/// Spaces out per-repository work according to the API's remaining quota.
#[derive(Debug, Clone)]
pub struct Pacer {
    delay: Duration,
    low_watermark: u64,
    max_wait: Duration,
}

impl Pacer {
    pub fn new(cfg: &Pacing) -> Self {
        Self {
            delay: Duration::from_millis(cfg.delay_ms),
            low_watermark: cfg.low_watermark,
            max_wait: Duration::from_secs(cfg.max_wait_secs),
        }
    }

    pub fn delay_for(&self, status: Option<RateStatus>, now: u64) -> Duration {
        match status {
            Some(rate) if rate.remaining <= self.low_watermark => {
                let until_reset = Duration::from_secs(rate.reset.saturating_sub(now).saturating_add(1));
                until_reset.min(self.max_wait).max(self.delay)
            }
            _ => self.delay,
        }
    }

    pub async fn wait(&self, gh: &dyn GitHub) {
        let status = match gh.rate_limit().await {
            Ok(status) => Some(status),
            Err(e) => {
                debug!("Rate limit status unavailable: {e:#}");
                None
            }
        };

        let delay = self.delay_for(status, unix_now());
        if delay > self.delay {
            if let Some(rate) = status {
                warn!(
                    "Only {}/{} API requests left, pausing {}s until reset",
                    rate.remaining,
                    rate.limit,
                    delay.as_secs()
                );
            }
        }

        sleep(delay).await;
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
