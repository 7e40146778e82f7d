//! NED API integration for electricity-mix emission factors
//!
//! The client fetches realised ("current") and predicted ("forecast") slots
//! for one grid point; the selector picks the current slot and the greenest
//! forecast slot out of them.

pub mod client;
pub mod selector;
pub mod types;

// Re-exports for the public API surface
pub use client::{EmissionFetcher, NedClient};
pub use selector::{match_current, min_emission_slot};
pub use types::{Classification, FetchMeta, FetchResult, TimeSlotRecord, parse_timestamp};
