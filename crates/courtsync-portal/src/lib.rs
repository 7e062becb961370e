//! Typed client for the booking portal's internal transactional API.
//!
//! Everything here sits at the boundary described by the portal's dashboard:
//! availability lookups, cart manipulation, customer resolution, discounting,
//! booking creation and cancellation, all over an authenticated HTTP channel
//! whose bearer token is derived from the operator's browser session.

mod client;
mod error;
mod normalize;
mod retry;
mod token;
mod types;

pub use client::{PortalApi, PortalClient};
pub use error::PortalError;
pub use normalize::normalize_phone;
pub use retry::retry_on_server_error;
pub use token::{StaticTokenProvider, TokenProvider};
pub use types::{
    AvailabilityResponse, BookingConfirmation, CartLine, CourtAvailability, CustomerRef,
    NewBooking, RefundType, SlotInfo,
};
