//! Delivery pipeline tuning.
//!
//! Every knob has a default suitable for a single-node deployment and an
//! environment-variable override for operators (`VEIL_DELIVERY_*`).

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Concurrent delivery workers.  Also the upper bound on jobs being
    /// processed at once.
    pub workers: usize,
    /// Total persistence attempts per job before it is marked `Failed`.
    pub max_attempts: u32,
    /// Base of the exponential retry backoff.
    pub backoff_base: Duration,
    /// Ceiling on any single backoff delay.
    pub backoff_cap: Duration,
    /// Default budget for `await_completion`.
    pub await_timeout: Duration,
    /// How many completed/failed jobs stay queryable before the oldest
    /// are evicted.
    pub retained_terminal_jobs: usize,
    /// Per-subscriber push channel depth.  A slow consumer loses realtime
    /// events beyond this, never stalls delivery.
    pub push_buffer: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            max_attempts: 3,
            backoff_base: Duration::from_millis(250),
            backoff_cap: Duration::from_secs(5),
            await_timeout: Duration::from_secs(30),
            retained_terminal_jobs: 512,
            push_buffer: 64,
        }
    }
}

impl DeliveryConfig {
    /// Defaults overridden by `VEIL_DELIVERY_*` environment variables.
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            workers: env_or("VEIL_DELIVERY_WORKERS", d.workers),
            max_attempts: env_or("VEIL_DELIVERY_MAX_ATTEMPTS", d.max_attempts),
            backoff_base: Duration::from_millis(env_or(
                "VEIL_DELIVERY_BACKOFF_BASE_MS",
                d.backoff_base.as_millis() as u64,
            )),
            backoff_cap: Duration::from_millis(env_or(
                "VEIL_DELIVERY_BACKOFF_CAP_MS",
                d.backoff_cap.as_millis() as u64,
            )),
            await_timeout: Duration::from_secs(env_or(
                "VEIL_DELIVERY_TIMEOUT_SECS",
                d.await_timeout.as_secs(),
            )),
            retained_terminal_jobs: env_or(
                "VEIL_DELIVERY_RETAINED_JOBS",
                d.retained_terminal_jobs,
            ),
            push_buffer: env_or("VEIL_PUSH_BUFFER", d.push_buffer),
        }
    }

    /// Delay before retry number `attempt` (1-based): `base * 2^attempt`,
    /// capped.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.backoff_base
            .saturating_mul(factor)
            .min(self.backoff_cap)
    }
}

fn env_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(v) => v,
            Err(_) => {
                warn!(key, value = %raw, "unparseable setting, using default");
                default
            }
        },
        Err(_) => default,
    }
}
