use crate::error::EstimatorError;
use crate::estimator::minimize::{AxisTrace, best_shift, drag_shift};
use crate::estimator::tests::{beam_events, reported_trace};

/// Split a synthetic position trace into the two per-axis event streams
/// the touch stack delivers.
fn axis_traces(latency: f64) -> (AxisTrace, AxisTrace) {
    let positions = reported_trace(6.3, latency);
    let t: Vec<f64> = positions.iter().map(|p| p.timestamp).collect();
    let x = AxisTrace::new(t.clone(), positions.iter().map(|p| p.x).collect());
    let y = AxisTrace::new(t, positions.iter().map(|p| p.y).collect());
    (x, y)
}

#[test]
fn test_recovers_known_shift_within_fine_step() {
    // The reported trace lags the physical sweep by exactly 50 ms; the
    // beam events carry physical time. The minimizer must find the shift
    // to within the fine grid step (0.02 ms).
    let shift = 0.05;
    let (x, y) = axis_traces(shift);
    let beam: Vec<f64> = beam_events(6).iter().map(|c| c.timestamp).collect();

    let found = drag_shift(&x, &y, &beam).unwrap();
    assert!(
        (found - shift).abs() < 3e-5,
        "expected ~{shift}, found {found}"
    );
}

#[test]
fn test_zero_shift_for_aligned_data() {
    let (x, y) = axis_traces(0.0);
    let beam: Vec<f64> = beam_events(6).iter().map(|c| c.timestamp).collect();

    let found = drag_shift(&x, &y, &beam).unwrap();
    assert!(found.abs() < 3e-5, "expected ~0, found {found}");
}

#[test]
fn test_single_grid_pass_brackets_the_optimum() {
    let shift = 0.05;
    let (x, y) = axis_traces(shift);
    let beam: Vec<f64> = beam_events(6).iter().map(|c| c.timestamp).collect();

    // One coarse pass alone localizes to the step size.
    let coarse = best_shift(&x, &y, &beam, 0.0, 0.2, 1e-3).unwrap();
    assert!((coarse - shift).abs() < 1.5e-3, "coarse found {coarse}");
}

#[test]
fn test_too_few_events_per_side() {
    let (x, y) = axis_traces(0.01);
    // Four events leave two per side, below the minimum of three.
    let beam = [0.4, 0.6, 1.4, 1.6];

    let err = drag_shift(&x, &y, &beam).unwrap_err();
    assert!(matches!(
        err,
        EstimatorError::InsufficientData { side_events: 2, .. }
    ));
}

#[test]
fn test_empty_inputs_rejected() {
    let (x, y) = axis_traces(0.01);
    let beam: Vec<f64> = beam_events(6).iter().map(|c| c.timestamp).collect();

    assert!(matches!(
        drag_shift(&AxisTrace::default(), &y, &beam),
        Err(EstimatorError::EmptyInput { .. })
    ));
    assert!(matches!(
        drag_shift(&x, &y, &[]),
        Err(EstimatorError::EmptyInput { .. })
    ));
}
