use chrono::{NaiveDate, NaiveTime};
use courtsync_portal::RefundType;

/// One queued refresh of a single day's availability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub date: NaiveDate,
    /// Forced requests bypass the cooldown and replace any in-flight
    /// completion for the same date.
    pub force: bool,
    /// Restrict the refresh to these sports; `None` means all configured.
    pub sport_filter: Option<Vec<String>>,
}

/// What a caller observes after asking for a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The scheduler dispatched a cycle covering the date.
    Completed { success: bool },
    /// The wait window elapsed. The refresh itself keeps running.
    TimedOut,
}

/// Everything needed to book one slot for one customer.
#[derive(Debug, Clone)]
pub struct BookingIntent {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub sport: String,
    pub court: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub remarks: String,
}

/// Confirmed booking details handed back for local persistence.
#[derive(Debug, Clone)]
pub struct BookingResult {
    pub booking_id: Option<String>,
    pub gross_amount: i64,
}

/// A slot addressed by its calendar position rather than a booking id.
#[derive(Debug, Clone)]
pub struct SlotRef {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub sport: String,
    pub court: String,
}

/// Direct cancellation of a known portal booking.
#[derive(Debug, Clone)]
pub struct CancellationIntent {
    pub booking_id: String,
    pub refund_type: RefundType,
    pub send_sms: bool,
}
