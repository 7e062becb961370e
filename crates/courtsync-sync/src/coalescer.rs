//! Deduplication of concurrent refresh requests.
//!
//! At most one unresolved completion exists per date. Later unforced
//! requests for the same date attach to it instead of queueing a second
//! scrape; forced requests always queue and take over the date's completion
//! slot. A caller timing out or disappearing never cancels the underlying
//! refresh.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::{watch, Mutex, Notify};

use crate::types::{RequestOutcome, ScrapeRequest};

/// State shared between the coalescer (producer side) and the scheduler
/// (consumer side).
pub(crate) struct SharedSync {
    /// Unresolved completions, one per date. `None` in the channel means
    /// still pending; `Some(success)` is terminal.
    pub(crate) pending: Mutex<HashMap<NaiveDate, watch::Sender<Option<bool>>>>,
    pub(crate) queue: Mutex<VecDeque<ScrapeRequest>>,
    pub(crate) wake: Notify,
}

impl SharedSync {
    pub(crate) fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            queue: Mutex::new(VecDeque::new()),
            wake: Notify::new(),
        }
    }

    /// Resolves the date's completion, if one is outstanding. Waiters that
    /// already timed out simply never read the value.
    pub(crate) async fn resolve(&self, date: NaiveDate, success: bool) {
        if let Some(sender) = self.pending.lock().await.remove(&date) {
            let _ = sender.send(Some(success));
        }
    }
}

/// Caller-facing handle for requesting availability refreshes.
#[derive(Clone)]
pub struct RequestCoalescer {
    shared: Arc<SharedSync>,
    wait: Duration,
}

impl RequestCoalescer {
    pub(crate) fn new(shared: Arc<SharedSync>, wait: Duration) -> Self {
        Self { shared, wait }
    }

    /// Requests a refresh of `date` and waits for it to complete, up to the
    /// configured wait window.
    ///
    /// Unforced requests coalesce onto an in-flight refresh of the same date.
    /// Forced requests always enqueue, replacing the date's completion so the
    /// caller observes its own scrape rather than an older one.
    pub async fn request_date(
        &self,
        date: NaiveDate,
        force: bool,
        sport_filter: Option<Vec<String>>,
    ) -> RequestOutcome {
        let mut receiver = {
            let mut pending = self.shared.pending.lock().await;

            let in_flight = if force {
                None
            } else {
                // A resolved sender still in the map cannot happen (resolve
                // removes it), but guard on the value anyway.
                pending
                    .get(&date)
                    .filter(|sender| sender.borrow().is_none())
                    .map(watch::Sender::subscribe)
            };

            match in_flight {
                Some(receiver) => {
                    tracing::debug!(%date, "joining in-flight refresh");
                    receiver
                }
                None => {
                    let (sender, receiver) = watch::channel(None);
                    pending.insert(date, sender);
                    self.shared.queue.lock().await.push_back(ScrapeRequest {
                        date,
                        force,
                        sport_filter,
                    });
                    self.shared.wake.notify_one();
                    tracing::debug!(%date, force, "queued refresh");
                    receiver
                }
            }
        };

        let outcome = match tokio::time::timeout(self.wait, receiver.wait_for(Option::is_some))
            .await
        {
            Ok(Ok(value)) => RequestOutcome::Completed {
                success: (*value).unwrap_or(false),
            },
            // The sender was dropped without resolving; treat as failure.
            Ok(Err(_)) => RequestOutcome::Completed { success: false },
            Err(_) => {
                tracing::warn!(%date, "refresh wait window elapsed, scrape continues in background");
                RequestOutcome::TimedOut
            }
        };
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::NaiveDate;

    use super::{RequestCoalescer, SharedSync};
    use crate::types::RequestOutcome;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).expect("valid date")
    }

    #[tokio::test]
    async fn concurrent_requests_for_same_date_queue_once() {
        let shared = Arc::new(SharedSync::new());
        let coalescer = RequestCoalescer::new(Arc::clone(&shared), Duration::from_secs(5));

        let first = {
            let c = coalescer.clone();
            tokio::spawn(async move { c.request_date(date(1), false, None).await })
        };
        let second = {
            let c = coalescer.clone();
            tokio::spawn(async move { c.request_date(date(1), false, None).await })
        };

        // Give both callers time to register before resolving.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(shared.queue.lock().await.len(), 1);

        shared.resolve(date(1), true).await;
        assert_eq!(
            first.await.unwrap(),
            RequestOutcome::Completed { success: true }
        );
        assert_eq!(
            second.await.unwrap(),
            RequestOutcome::Completed { success: true }
        );
    }

    #[tokio::test]
    async fn forced_request_enqueues_even_with_pending_completion() {
        let shared = Arc::new(SharedSync::new());
        let coalescer = RequestCoalescer::new(Arc::clone(&shared), Duration::from_secs(5));

        let unforced = {
            let c = coalescer.clone();
            tokio::spawn(async move { c.request_date(date(2), false, None).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let forced = {
            let c = coalescer.clone();
            tokio::spawn(async move { c.request_date(date(2), true, None).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(shared.queue.lock().await.len(), 2, "force must not coalesce");

        // Resolving the date settles whichever sender currently owns it; the
        // first caller's channel was replaced and its sender dropped.
        shared.resolve(date(2), true).await;
        assert_eq!(
            forced.await.unwrap(),
            RequestOutcome::Completed { success: true }
        );
        assert_eq!(
            unforced.await.unwrap(),
            RequestOutcome::Completed { success: false }
        );
    }

    #[tokio::test]
    async fn timeout_leaves_completion_pending() {
        let shared = Arc::new(SharedSync::new());
        let coalescer = RequestCoalescer::new(Arc::clone(&shared), Duration::from_millis(30));

        let outcome = coalescer.request_date(date(3), false, None).await;
        assert_eq!(outcome, RequestOutcome::TimedOut);

        // The completion and queued request survive the caller's timeout.
        assert!(shared.pending.lock().await.contains_key(&date(3)));
        assert_eq!(shared.queue.lock().await.len(), 1);

        // A later caller joins the still-pending refresh instead of queueing.
        let late = {
            let c = RequestCoalescer::new(Arc::clone(&shared), Duration::from_secs(5));
            tokio::spawn(async move { c.request_date(date(3), false, None).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(shared.queue.lock().await.len(), 1);

        shared.resolve(date(3), false).await;
        assert_eq!(
            late.await.unwrap(),
            RequestOutcome::Completed { success: false }
        );
    }

    #[tokio::test]
    async fn distinct_dates_do_not_coalesce() {
        let shared = Arc::new(SharedSync::new());
        let coalescer = RequestCoalescer::new(Arc::clone(&shared), Duration::from_millis(20));

        let _ = coalescer.request_date(date(4), false, None).await;
        let _ = coalescer.request_date(date(5), false, None).await;

        assert_eq!(shared.queue.lock().await.len(), 2);
        assert_eq!(shared.pending.lock().await.len(), 2);
    }
}
