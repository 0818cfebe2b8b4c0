//! # latimer
//!
//! Host-side driver for a serial latency-measurement probe.
//!
//! The probe is a microcontroller with its own free-running clock and a set
//! of physical sensors (laser gate, photodiode, shock sensor). This crate
//! talks to it over a serial link and turns timestamped physical events into
//! end-to-end latency numbers for touch, drag, screen and audio pipelines.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use latimer::{LinkConfig, ProbeClient, SerialLink, SyncConfig};
//!
//! # async fn example() -> Result<(), latimer::ProbeError> {
//! let link = Arc::new(SerialLink::open(&LinkConfig::new("/dev/ttyACM0"))?);
//! let mut probe = ProbeClient::new(link);
//!
//! probe.reset().await?;
//! let state = probe.clock_mut().zero_clock(&SyncConfig::default()).await?;
//! println!("clock zeroed, round trip {:.3} ms", state.max_lag() * 1e3);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! - **High-level**: [`ProbeClient`] - Named probe operations
//! - **Mid-level**: [`clock::ClockSync`], [`bridge::BridgeServer`],
//!   [`estimator`] - Sync protocols, TCP bridging, latency math
//! - **Low-level**: [`link::ProbeLink`] - Direct serial access

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
/// Error types
pub mod error;
/// Core configuration types
pub mod types;

/// Testing utilities
pub mod testing;

// Internal modules
pub mod bridge;
pub mod clock;
pub mod estimator;
pub mod link;
mod probe;
/// Measurement report types
pub mod report;

// Re-exports
pub use bridge::BridgeServer;
pub use clock::{ClockState, ClockSync};
pub use error::ProbeError;
pub use link::{Command, ProbeLink, RoundTrip, SerialLink, TriggerEvent, TriggerKind};
pub use probe::{ProbeClient, TriggerStream};
pub use report::MeasurementReport;
pub use types::{BridgeConfig, LinkConfig, SyncConfig};
