//! Latency estimation algorithms.
//!
//! Pure numeric components: everything here operates on already-loaded
//! timestamp sequences and performs no I/O. Input sequences must be sorted
//! ascending by timestamp, strictly increasing per source — callers are
//! responsible, nothing here re-sorts.
//!
//! Two independent drag-latency methods are provided:
//!
//! - [`minimize::drag_shift`] — grid-search time-shift minimization: find
//!   the shift that makes the beam-crossing events sit on straight lines in
//!   touch coordinates.
//! - [`crossing::measure_latencies`] — line-crossing interpolation: estimate
//!   the two physical beam lines, then time the trace's observed crossings
//!   against the beam timestamps.
//!
//! Plus [`screen::blink_response`] for screen (vsync-to-photodiode) latency
//! and small shared statistics helpers in [`stats`].

pub mod crossing;
pub mod fit;
pub mod interp;
pub mod minimize;
pub mod screen;
pub mod stats;

#[cfg(test)]
mod tests;

pub use crossing::{FingerPosition, LaserCrossing, measure_latencies};
pub use fit::LineFit;
pub use minimize::{AxisTrace, drag_shift};
pub use screen::{BlinkStats, blink_response};

/// Which side of the beam a crossing event belongs to.
///
/// The finger sweeps back and forth over the beam, so consecutive events
/// alternate sides in the pattern 0, 1, 1, 0, 0, 1, 1, ...: index parity
/// `((i + 1) / 2) % 2` in integer arithmetic.
pub(crate) fn beam_side(index: usize) -> usize {
    ((index + 1) / 2) % 2
}
