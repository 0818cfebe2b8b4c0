//! Line-crossing drag-latency estimation.
//!
//! The beam defines two physical lines on the touch surface (one per sweep
//! direction of the gate geometry). Interpolating the finger position at
//! each beam timestamp recovers points on those lines; fitting a line per
//! side estimates where the beam really sits. The touch trace's own
//! crossings of each fitted line are the events the device under test
//! observed, and the latency is the time between each observed crossing and
//! the matching beam timestamp.

use tracing::warn;

use super::beam_side;
use super::fit::{LineFit, fit_line};

/// A touch-surface reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerPosition {
    /// Sample time, seconds.
    pub timestamp: f64,
    /// Horizontal coordinate, device units.
    pub x: f64,
    /// Vertical coordinate, device units.
    pub y: f64,
}

/// A beam-crossing event from the probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaserCrossing {
    /// Event time, seconds, on the same clock as the position trace.
    pub timestamp: f64,
    /// 0 = beam went dark, 1 = beam cleared.
    pub direction: u8,
}

/// Distance in device units within which a sample counts as "on the line"
/// rather than on either side.
const ON_LINE_EPSILON: f64 = 2.0;

/// Crossing points per side needed to fit a beam line.
const MIN_POINTS_PER_SIDE: usize = 2;

/// Clip both sequences to their temporal overlap.
///
/// Latency is only defined where both instruments were recording; samples
/// of either source outside the other's time range are discarded.
#[must_use]
pub fn clip_overlap(
    positions: &[FingerPosition],
    crossings: &[LaserCrossing],
) -> (Vec<FingerPosition>, Vec<LaserCrossing>) {
    let (Some(p_first), Some(p_last)) = (positions.first(), positions.last()) else {
        return (Vec::new(), Vec::new());
    };
    let (Some(c_first), Some(c_last)) = (crossings.first(), crossings.last()) else {
        return (Vec::new(), Vec::new());
    };

    let clipped_positions = positions
        .iter()
        .filter(|p| p.timestamp >= c_first.timestamp && p.timestamp <= c_last.timestamp)
        .copied()
        .collect();
    let clipped_crossings = crossings
        .iter()
        .filter(|c| c.timestamp >= p_first.timestamp && c.timestamp <= p_last.timestamp)
        .copied()
        .collect();
    (clipped_positions, clipped_crossings)
}

/// Finger position at each beam timestamp, interpolated between the
/// bracketing samples weighted by relative time distance.
///
/// A crossing with no sample after it is dropped — there is nothing to
/// bracket with.
fn crossing_points(
    positions: &[FingerPosition],
    crossings: &[LaserCrossing],
) -> Vec<FingerPosition> {
    let mut points = Vec::with_capacity(crossings.len());
    for crossing in crossings {
        let Some(after_idx) = positions
            .iter()
            .skip(1)
            .position(|p| p.timestamp > crossing.timestamp)
            .map(|i| i + 1)
        else {
            continue;
        };
        let before = positions[after_idx - 1];
        let after = positions[after_idx];
        let gap = after.timestamp - before.timestamp;
        let before_weight = (after.timestamp - crossing.timestamp) / gap;
        let after_weight = 1.0 - before_weight;
        points.push(FingerPosition {
            timestamp: crossing.timestamp,
            x: before.x * before_weight + after.x * after_weight,
            y: before.y * before_weight + after.y * after_weight,
        });
    }
    points
}

/// Which side of `line` a sample lies on: 0 within the dead zone, 1 above,
/// -1 below (in signed vertical distance).
fn which_side(line: &LineFit, p: &FingerPosition) -> i8 {
    let distance = line.eval(p.x) - p.y;
    if distance.abs() <= ON_LINE_EPSILON {
        0
    } else if distance > 0.0 {
        1
    } else {
        -1
    }
}

/// Walk the trace and collect every sample where the signed distance to
/// `line` changes sign. Entering the dead zone is not a crossing; a sign
/// change out of the dead zone counts once.
fn trace_crossings(positions: &[FingerPosition], line: &LineFit) -> Vec<FingerPosition> {
    let Some(first) = positions.first() else {
        return Vec::new();
    };
    let mut last_side = which_side(line, first);
    let mut observed = Vec::new();
    for position in positions {
        let current_side = which_side(line, position);
        if current_side != last_side && last_side != 0 {
            observed.push(*position);
        }
        last_side = current_side;
    }
    observed
}

/// Pair observed crossings against beam crossing points, in order, and
/// emit `observed - beam` per pair. Extra events on either side are
/// dropped by the pairing.
fn pair_latencies(observed: &[FingerPosition], beam: &[FingerPosition]) -> Vec<f64> {
    observed
        .iter()
        .zip(beam)
        .map(|(o, b)| o.timestamp - b.timestamp)
        .collect()
}

/// Compute one latency per detected crossing of each beam line.
///
/// Output is the concatenation of side 0's and side 1's latency sequences;
/// callers take median or mean as needed. An empty overlap or a side with
/// too few events to define its line yields an empty result — never a
/// fabricated latency.
#[must_use]
pub fn measure_latencies(
    positions: &[FingerPosition],
    crossings: &[LaserCrossing],
) -> Vec<f64> {
    let (positions, crossings) = clip_overlap(positions, crossings);
    if positions.is_empty() || crossings.is_empty() {
        warn!("no overlapping events between position trace and beam log");
        return Vec::new();
    }

    let points = crossing_points(&positions, &crossings);
    let mut sides: [Vec<FingerPosition>; 2] = [Vec::new(), Vec::new()];
    for (i, point) in points.iter().enumerate() {
        sides[beam_side(i)].push(*point);
    }

    let mut latencies = Vec::new();
    for side_points in &sides {
        if side_points.len() < MIN_POINTS_PER_SIDE {
            warn!(
                events = side_points.len(),
                "too few crossing events to estimate a beam line"
            );
            return Vec::new();
        }
        let xs: Vec<f64> = side_points.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = side_points.iter().map(|p| p.y).collect();
        let Some(line) = fit_line(&xs, &ys) else {
            warn!("degenerate beam-line geometry");
            return Vec::new();
        };
        let observed = trace_crossings(&positions, &line);
        latencies.extend(pair_latencies(&observed, side_points));
    }
    latencies
}
