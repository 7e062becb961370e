//! The availability refresh loop.
//!
//! Each cycle drains the request queue, injects the default near-term dates,
//! filters through the per-date cooldown, and fans the surviving batch out to
//! every ready adapter in parallel. One adapter failing never stops the
//! others; a cycle that dispatched the batch resolves every requested date.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Days, Local, NaiveDate};
use rand::Rng;

use crate::adapter::{PortalAdapter, ScrapeStatusStore};
use crate::coalescer::{RequestCoalescer, SharedSync};
use crate::config::SyncConfig;
use crate::types::ScrapeRequest;

pub struct SyncScheduler {
    shared: Arc<SharedSync>,
    adapters: Vec<Arc<dyn PortalAdapter>>,
    status: Arc<dyn ScrapeStatusStore>,
    config: SyncConfig,
    last_refreshed: HashMap<NaiveDate, Instant>,
}

impl SyncScheduler {
    /// Builds a scheduler and the coalescer handle callers use to reach it.
    #[must_use]
    pub fn new(
        config: SyncConfig,
        adapters: Vec<Arc<dyn PortalAdapter>>,
        status: Arc<dyn ScrapeStatusStore>,
    ) -> (Self, RequestCoalescer) {
        let shared = Arc::new(SharedSync::new());
        let coalescer = RequestCoalescer::new(Arc::clone(&shared), config.request_wait);
        let scheduler = Self {
            shared,
            adapters,
            status,
            config,
            last_refreshed: HashMap::new(),
        };
        (scheduler, coalescer)
    }

    /// Runs cycles forever. Intended to be spawned as a background task.
    pub async fn run(mut self) {
        let shared = Arc::clone(&self.shared);
        loop {
            let wake = shared.wake.notified();
            tokio::pin!(wake);
            // A request that arrived while the previous cycle ran left a
            // permit behind; that request is in the queue and about to be
            // served, so drop the stale permit and re-arm.
            if wake.as_mut().enable() {
                wake.set(shared.wake.notified());
                let _armed = wake.as_mut().enable();
            }

            self.cycle().await;

            let idle = jittered_interval(&self.config);
            tokio::select! {
                () = &mut wake => {
                    tracing::debug!("woken early by a refresh request");
                }
                () = tokio::time::sleep(idle) => {}
            }
        }
    }

    async fn cycle(&mut self) {
        // Drain and normalize: last queued request per date wins, and the
        // default near-term dates are always covered.
        let mut by_date: HashMap<NaiveDate, ScrapeRequest> = HashMap::new();
        for request in self.shared.queue.lock().await.drain(..) {
            by_date.insert(request.date, request);
        }
        let today = Local::now().date_naive();
        for date in [today, today + Days::new(1)] {
            by_date.entry(date).or_insert(ScrapeRequest {
                date,
                force: false,
                sport_filter: None,
            });
        }

        // Cooldown: recently refreshed dates are skipped and their waiters
        // resolved with the data already on hand. Force bypasses.
        let now = Instant::now();
        let mut batch: Vec<ScrapeRequest> = Vec::new();
        for (date, request) in by_date {
            let cooled_down = self
                .last_refreshed
                .get(&date)
                .is_some_and(|last| now.duration_since(*last) < self.config.cooldown);
            if cooled_down && !request.force {
                tracing::debug!(%date, "within cooldown, serving existing data");
                self.shared.resolve(date, true).await;
                continue;
            }
            batch.push(request);
        }
        if batch.is_empty() {
            return;
        }

        // Forced requests first, then ascending date.
        batch.sort_by_key(|r| (!r.force, r.date));

        // Stamp before dispatch so a slow scrape is not immediately redone.
        for request in &batch {
            self.last_refreshed.insert(request.date, now);
        }

        let mut ready: Vec<Arc<dyn PortalAdapter>> = Vec::new();
        for adapter in &self.adapters {
            if adapter.is_ready() {
                ready.push(Arc::clone(adapter));
            } else {
                tracing::warn!(
                    source = adapter.source(),
                    "adapter not ready, skipping this cycle"
                );
            }
        }

        tracing::info!(
            dates = batch.len(),
            adapters = ready.len(),
            "dispatching refresh cycle"
        );

        let results = futures::future::join_all(ready.iter().map(|adapter| {
            let batch = &batch;
            async move { (adapter.source().to_string(), adapter.scrape(batch).await) }
        }))
        .await;

        for (source, result) in results {
            if let Err(error) = result {
                tracing::warn!(source = %source, error = %error, "adapter failed");
                for request in &batch {
                    if let Err(store_err) = self
                        .status
                        .record(&source, request.date, false, Some(&error.to_string()))
                        .await
                    {
                        tracing::error!(
                            source = %source,
                            error = %store_err,
                            "failed to record scrape failure"
                        );
                    }
                }
            }
        }

        // Dispatch attempted is the completion criterion: waiters get their
        // answer even when every adapter failed, because the freshest data we
        // will have for now is already in the store.
        for request in &batch {
            self.shared.resolve(request.date, true).await;
        }
    }
}

fn jittered_interval(config: &SyncConfig) -> Duration {
    let base = i64::try_from(config.base_interval.as_millis()).unwrap_or(i64::MAX);
    let jitter = i64::try_from(config.jitter.as_millis()).unwrap_or(0);
    let floor = i64::try_from(config.min_interval.as_millis()).unwrap_or(0);

    let offset = if jitter == 0 {
        0
    } else {
        rand::rng().random_range(-jitter..=jitter)
    };
    let millis = (base.saturating_add(offset)).max(floor);
    Duration::from_millis(u64::try_from(millis).unwrap_or(0))
}
