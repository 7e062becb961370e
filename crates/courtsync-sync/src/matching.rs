//! Court and slot matching against portal availability grids.
//!
//! Operators type short court names ("Court 2"); the portal reports full
//! names ("Badminton Court 2"), so the requested name is matched as a
//! substring. First match wins, so ambiguous names resolve to whichever
//! court the portal lists first.

use chrono::NaiveTime;
use courtsync_portal::{CourtAvailability, SlotInfo};

pub(crate) fn find_court<'a>(
    courts: &'a [CourtAvailability],
    requested: &str,
) -> Option<&'a CourtAvailability> {
    courts.iter().find(|c| c.court_name.contains(requested))
}

/// Slot times must match the portal's `HH:MM:SS` rendering exactly.
pub(crate) fn find_slot<'a>(court: &'a CourtAvailability, time: &str) -> Option<&'a SlotInfo> {
    court.slots.iter().find(|s| s.slot_time == time)
}

pub(crate) fn portal_time(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

/// End of a 30-minute slot. `NaiveTime` addition wraps at midnight, which is
/// exactly what the portal expects for a 23:30 slot ending at 00:00.
pub(crate) fn slot_end_time(start: NaiveTime) -> String {
    portal_time(start + chrono::Duration::minutes(30))
}
