//! Degree-1 least-squares line fitting.

use super::stats::mean;

/// A fitted line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    /// Slope of the fitted line.
    pub slope: f64,
    /// Intercept of the fitted line.
    pub intercept: f64,
}

impl LineFit {
    /// Evaluate the line at `x`.
    #[must_use]
    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Least-squares fit of a line through `(xs, ys)`.
///
/// Returns `None` for fewer than two points or zero spread in `xs` — a
/// degenerate input gets no fabricated fit.
#[must_use]
pub fn fit_line(xs: &[f64], ys: &[f64]) -> Option<LineFit> {
    debug_assert_eq!(xs.len(), ys.len());
    if xs.len() < 2 {
        return None;
    }
    let mx = mean(xs);
    let my = mean(ys);
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        sxx += (x - mx) * (x - mx);
        sxy += (x - mx) * (y - my);
    }
    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    Some(LineFit {
        slope,
        intercept: my - slope * mx,
    })
}

/// Sum of squared residuals of the best-fit line through `(xs, ys)`.
///
/// When `xs` has zero spread no line is fittable; the residual of the
/// constant fit `y = mean(ys)` is used instead so a grid search over
/// shifts stays total.
#[must_use]
pub fn linear_ssr(xs: &[f64], ys: &[f64]) -> f64 {
    match fit_line(xs, ys) {
        Some(line) => xs
            .iter()
            .zip(ys)
            .map(|(&x, &y)| {
                let r = y - line.eval(x);
                r * r
            })
            .sum(),
        None => {
            let my = mean(ys);
            ys.iter().map(|&y| (y - my) * (y - my)).sum()
        }
    }
}
