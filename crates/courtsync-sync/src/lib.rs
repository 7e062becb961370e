//! Background availability collection and booking automation.
//!
//! The scheduler owns a single refresh loop that fans out to portal adapters;
//! callers feed it through a request coalescer that deduplicates concurrent
//! refreshes of the same day. Booking and cancellation pipelines run under an
//! exclusive automation lock because the portal's cart is session-global.

mod adapter;
mod booking;
mod cancellation;
mod coalescer;
mod config;
mod error;
mod lock;
mod matching;
mod scheduler;
mod types;

pub use adapter::{
    AdapterError, ApiPortalAdapter, PortalAdapter, ScrapeStatusStore, SlotRecord, SlotStore,
    StoreError,
};
pub use booking::BookingOrchestrator;
pub use cancellation::CancellationOrchestrator;
pub use coalescer::RequestCoalescer;
pub use config::SyncConfig;
pub use error::BookingError;
pub use lock::{AutomationGuard, AutomationLock};
pub use scheduler::SyncScheduler;
pub use types::{
    BookingIntent, BookingResult, CancellationIntent, RequestOutcome, ScrapeRequest, SlotRef,
};
