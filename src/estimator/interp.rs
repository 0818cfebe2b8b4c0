//! Piecewise-linear interpolation.

/// Interpolate `ys` over `xs` at a single point.
///
/// `xs` must be strictly increasing. Outside the sample range the boundary
/// value is extended flat rather than extrapolated — a time-shift candidate
/// that walks off the trace should clamp, not fail.
///
/// Returns NaN for empty inputs.
#[must_use]
pub fn interp_at(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    let Some((&first, &last)) = xs.first().zip(xs.last()) else {
        return f64::NAN;
    };
    if x <= first {
        return ys[0];
    }
    if x >= last {
        return ys[ys.len() - 1];
    }
    // First index with xs[i] > x; in 1..len by the bounds checks above.
    let i = xs.partition_point(|&t| t <= x);
    let (x0, x1) = (xs[i - 1], xs[i]);
    let w = (x - x0) / (x1 - x0);
    ys[i - 1] + w * (ys[i] - ys[i - 1])
}

/// Interpolate at every point of `at`.
#[must_use]
pub fn interp_many(xs: &[f64], ys: &[f64], at: &[f64]) -> Vec<f64> {
    at.iter().map(|&x| interp_at(xs, ys, x)).collect()
}
