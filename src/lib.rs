//! # NED CO2 - electricity-mix emission factors for the Dutch grid
//!
//! Polls the NED energy-data API on a fixed interval and publishes two
//! derived values per grid point: the emission factor of the slot covering
//! "now" and the greenest forecast slot within a configurable window.
//!
//! ## Architecture
//!
//! - `config`: YAML configuration, environment overrides and validation
//! - `logging`: Structured logging and tracing
//! - `error`: Crate error type and per-cycle refresh errors
//! - `window`: Date-window computation for the API query
//! - `ned`: NED API client, row types and slot selection
//! - `coordinator`: Periodic refresh loop and published state
//! - `sensors`: Sensor values derived from the published state
//! - `entry`: Configured entries and their lifecycle
//! - `web`: Read-only HTTP surface (feature `web`)

pub mod config;
pub mod coordinator;
pub mod entry;
pub mod error;
pub mod logging;
pub mod ned;
pub mod sensors;
#[cfg(feature = "web")]
pub mod web;
pub mod window;

// Re-export commonly used types
pub use config::{Config, WindowConfig};
pub use coordinator::{Coordinator, CoordinatorHandle, CoordinatorState};
pub use entry::EntryRegistry;
pub use error::{NedError, RefreshError, Result};
pub use ned::{EmissionFetcher, FetchResult, NedClient, TimeSlotRecord};

/// Version string injected by the build script
pub const APP_VERSION: &str = env!("APP_VERSION");
