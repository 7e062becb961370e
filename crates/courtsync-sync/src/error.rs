use courtsync_portal::PortalError;
use thiserror::Error;

/// Failure modes of the booking and cancellation pipelines.
///
/// These never escape the orchestrators' public entry points; they exist so
/// the pipeline internals can short-circuit with `?` and the entry point can
/// log one coherent reason.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("unknown sport '{0}'")]
    UnknownSport(String),

    #[error("no court matching '{0}'")]
    CourtNotFound(String),

    #[error("slot not available: {0}")]
    SlotUnavailable(String),

    #[error("no booked slot matches the requested court and time")]
    BookingNotFound,

    #[error(transparent)]
    Portal(#[from] PortalError),
}
