use std::time::Duration;

use courtsync_core::AppConfig;

/// Timing knobs for the refresh loop and request coalescer.
#[derive(Debug, Clone, Copy)]
pub struct SyncConfig {
    /// Minimum gap between unforced refreshes of the same date.
    pub cooldown: Duration,
    /// Nominal idle time between scheduler cycles.
    pub base_interval: Duration,
    /// The idle time is perturbed by up to this much in either direction so
    /// cycles do not land on the portal at a fixed cadence.
    pub jitter: Duration,
    /// Lower bound on the jittered idle time.
    pub min_interval: Duration,
    /// How long a caller waits for a requested refresh to complete.
    pub request_wait: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(600),
            base_interval: Duration::from_secs(600),
            jitter: Duration::from_secs(60),
            min_interval: Duration::from_secs(60),
            request_wait: Duration::from_secs(90),
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            cooldown: Duration::from_secs(config.sync_cooldown_secs),
            base_interval: Duration::from_secs(config.sync_interval_secs),
            jitter: Duration::from_secs(config.sync_jitter_secs),
            min_interval: Duration::from_secs(60),
            request_wait: Duration::from_secs(config.request_wait_secs),
        }
    }
}
