mod interp;
mod minimize;
mod stats;

use super::crossing::{FingerPosition, LaserCrossing};

/// Sample period of the synthetic touch traces, seconds.
pub(crate) const DT: f64 = 1e-3;

/// Triangle-wave finger sweep: one-second sweeps alternating up (0 -> 100)
/// and down (100 -> 0), evaluated at time `t >= 0`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn sweep_y(t: f64) -> f64 {
    let sweep = t.floor();
    let phase = t - sweep;
    if (sweep as u64) % 2 == 0 {
        100.0 * phase
    } else {
        100.0 - 100.0 * phase
    }
}

/// X coordinate per sweep pair: the finger drifts sideways every two
/// sweeps (0, 0, 2, 2, 4, 4, ...).
pub(crate) fn sweep_x(t: f64) -> f64 {
    (t.floor() / 2.0).floor() * 2.0
}

/// Synthetic reported touch trace: the physical sweep delayed by
/// `latency` seconds, sampled every [`DT`] over `[0, duration]`.
pub(crate) fn reported_trace(duration: f64, latency: f64) -> Vec<FingerPosition> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n = (duration / DT).round() as usize;
    (0..=n)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f64 * DT;
            let physical_t = (t - latency).max(0.0);
            FingerPosition {
                timestamp: t,
                x: sweep_x(physical_t),
                y: sweep_y(physical_t),
            }
        })
        .collect()
}

/// Physical beam-crossing times for `sweeps` one-second sweeps over the
/// beam lines at y = 40 (lower edge) and y = 60 (upper edge), with the
/// alternating direction values the probe reports.
pub(crate) fn beam_events(sweeps: usize) -> Vec<LaserCrossing> {
    let mut events = Vec::new();
    for j in 0..sweeps {
        #[allow(clippy::cast_precision_loss)]
        let base = j as f64;
        // Up sweeps cross y=40 then y=60; down sweeps y=60 then y=40. The
        // crossing instants land at the same phase either way.
        events.push(LaserCrossing {
            timestamp: base + 0.4,
            direction: 0,
        });
        events.push(LaserCrossing {
            timestamp: base + 0.6,
            direction: 1,
        });
    }
    events
}
