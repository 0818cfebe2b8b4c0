//! TCP bridge to the probe.
//!
//! Multiplexes a network client's commands onto the single serial link
//! shared with the background forward loop. The pause/resume handshake in
//! [`forward`] guarantees at most one reader of the serial channel at any
//! instant; see [`BridgeServer`] for the protocol surface.

pub(crate) mod forward;
pub mod server;

#[cfg(test)]
mod tests;

pub use server::BridgeServer;
