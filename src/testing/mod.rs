//! Testing utilities.
//!
//! Provides a scripted in-memory probe ([`MockLink`]) so protocol and
//! bridge logic can be exercised without real hardware.

pub mod mock_link;

pub use mock_link::MockLink;
