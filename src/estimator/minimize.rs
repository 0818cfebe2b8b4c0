//! Grid-search time-shift minimization.
//!
//! The finger sweeps back and forth over the beam while the touch surface
//! reports (t, x) and (t, y) samples and the probe reports beam-crossing
//! times on its own (already converted) clock. Shifting the beam times by
//! the true latency makes the crossing positions collapse onto the two
//! physical beam lines; any other shift scatters them. The latency is
//! therefore the shift minimizing the residual of a per-side line fit.

use tracing::{debug, warn};

use super::fit::linear_ssr;
use super::interp::interp_at;
use super::{beam_side, stats};
use crate::error::EstimatorError;

/// Coarse search: [0, 200] ms at 1 ms steps.
const COARSE_STEP: f64 = 1e-3;
const COARSE_MAX: f64 = 0.2;

/// Fine search: coarse optimum ± 3 ms at 0.02 ms steps.
const FINE_STEP: f64 = 2e-5;
const FINE_HALF_RANGE: f64 = 3.0 * COARSE_STEP;

/// Minimum crossing events per beam side for a meaningful residual.
const MIN_EVENTS_PER_SIDE: usize = 3;

/// One axis of the touch trace: positions `v` sampled at times `t`.
///
/// X and Y samples arrive as separate event streams at their own
/// timestamps, so the two axes are kept as independent traces.
#[derive(Debug, Clone, Default)]
pub struct AxisTrace {
    /// Sample timestamps, strictly increasing.
    pub t: Vec<f64>,
    /// Sample positions.
    pub v: Vec<f64>,
}

impl AxisTrace {
    /// Build a trace from parallel timestamp/position vectors.
    ///
    /// # Panics
    /// Panics if the vectors differ in length.
    #[must_use]
    pub fn new(t: Vec<f64>, v: Vec<f64>) -> Self {
        assert_eq!(t.len(), v.len(), "trace vectors must be parallel");
        Self { t, v }
    }
}

/// Search `[min_shift, max_shift)` in `step` increments for the shift that
/// best lines up the beam events, per side, and average the two sides'
/// optima.
///
/// # Errors
/// [`EstimatorError::InsufficientData`] when either side has fewer than
/// three events.
pub fn best_shift(
    x: &AxisTrace,
    y: &AxisTrace,
    beam_times: &[f64],
    min_shift: f64,
    max_shift: f64,
    step: f64,
) -> Result<f64, EstimatorError> {
    let side0: Vec<usize> = (0..beam_times.len()).filter(|&i| beam_side(i) == 0).collect();
    let side1: Vec<usize> = (0..beam_times.len()).filter(|&i| beam_side(i) == 1).collect();
    let sparsest = side0.len().min(side1.len());
    if sparsest < MIN_EVENTS_PER_SIDE {
        return Err(EstimatorError::InsufficientData {
            side_events: sparsest,
            needed: MIN_EVENTS_PER_SIDE,
        });
    }

    let mut best = [(f64::INFINITY, min_shift); 2];
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let steps = ((max_shift - min_shift) / step).ceil().max(0.0) as usize;
    let mut xl = vec![0.0; beam_times.len()];
    let mut yl = vec![0.0; beam_times.len()];
    for k in 0..steps {
        #[allow(clippy::cast_precision_loss)]
        let shift = min_shift + k as f64 * step;
        // Touch position at each shifted beam time.
        for (i, &tl) in beam_times.iter().enumerate() {
            xl[i] = interp_at(&x.t, &x.v, tl + shift);
            yl[i] = interp_at(&y.t, &y.v, tl + shift);
        }
        for (side, indices) in [&side0, &side1].into_iter().enumerate() {
            let xs: Vec<f64> = indices.iter().map(|&i| xl[i]).collect();
            let ys: Vec<f64> = indices.iter().map(|&i| yl[i]).collect();
            let ssr = linear_ssr(&xs, &ys);
            if ssr < best[side].0 {
                best[side] = (ssr, shift);
            }
        }
    }

    Ok((best[0].1 + best[1].1) / 2.0)
}

/// Two-phase drag-latency search: a broad, cheap grid to localize the
/// optimum, then a narrow, precise grid around it.
///
/// Times are rebased so the earliest touch sample is zero; `beam_times`
/// must share the callers' clock with the traces.
///
/// # Errors
/// [`EstimatorError::EmptyInput`] for empty traces or beam sequence;
/// [`EstimatorError::InsufficientData`] from the per-side event check.
pub fn drag_shift(
    x: &AxisTrace,
    y: &AxisTrace,
    beam_times: &[f64],
) -> Result<f64, EstimatorError> {
    let (Some(&x0), Some(&y0)) = (x.t.first(), y.t.first()) else {
        return Err(EstimatorError::EmptyInput {
            name: "position trace",
        });
    };
    if beam_times.is_empty() {
        return Err(EstimatorError::EmptyInput {
            name: "beam crossings",
        });
    }

    // Rebase so interpolation works in small numbers near zero.
    let t0 = x0.min(y0);
    let rebase = |ts: &[f64]| ts.iter().map(|t| t - t0).collect::<Vec<_>>();
    let x = AxisTrace {
        t: rebase(&x.t),
        v: x.v.clone(),
    };
    let y = AxisTrace {
        t: rebase(&y.t),
        v: y.v.clone(),
    };
    let beam: Vec<f64> = rebase(beam_times);

    if stats::std_dev(&x.v) * 2.0 < stats::std_dev(&y.v) {
        warn!("little motion in the x axis; shift estimate may be poor");
    }

    let coarse = best_shift(&x, &y, &beam, 0.0, COARSE_MAX, COARSE_STEP)?;
    let fine = best_shift(
        &x,
        &y,
        &beam,
        coarse - FINE_HALF_RANGE,
        coarse + FINE_HALF_RANGE,
        FINE_STEP,
    )?;
    debug!(
        coarse_ms = coarse * 1e3,
        fine_ms = fine * 1e3,
        "drag shift search"
    );
    Ok(fine)
}
