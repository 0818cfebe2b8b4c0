//! Host/probe clock synchronization.
//!
//! Establishes a shared time reference over the serial link and bounds its
//! uncertainty. See [`ClockSync`] for the two protocols.

pub mod state;
pub mod sync;

#[cfg(test)]
mod tests;

pub use state::ClockState;
pub use sync::{ClockSync, RoundTripStats};
