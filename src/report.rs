//! Serializable per-run measurement summaries.
//!
//! A run produces flat result values (a shift, a latency sequence, a pair
//! of medians); this module gives them one JSON-serializable shape so
//! runners can persist or upload results without inventing formats.

use serde::{Deserialize, Serialize};

use crate::estimator::BlinkStats;
use crate::estimator::stats::median;

/// Drag-latency results from either estimator.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DragSummary {
    /// Best-fit global shift from the grid-search method, milliseconds.
    pub shift_ms: Option<f64>,
    /// Per-crossing latencies from the line-crossing method, milliseconds.
    pub crossing_latencies_ms: Vec<f64>,
    /// Median of the crossing latencies, milliseconds.
    pub crossing_median_ms: Option<f64>,
}

/// Tap-latency results, split by contact direction.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TapSummary {
    /// Median finger-down latency, milliseconds.
    pub median_down_ms: Option<f64>,
    /// Median finger-up latency, milliseconds.
    pub median_up_ms: Option<f64>,
    /// Number of taps measured.
    pub count: usize,
}

/// Screen blink response results.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScreenSummary {
    /// Median of even transitions, milliseconds.
    pub even_median_ms: f64,
    /// Standard deviation of even transitions, milliseconds.
    pub even_std_ms: f64,
    /// Median of odd transitions, milliseconds.
    pub odd_median_ms: f64,
    /// Standard deviation of odd transitions, milliseconds.
    pub odd_std_ms: f64,
}

impl From<&BlinkStats> for ScreenSummary {
    fn from(stats: &BlinkStats) -> Self {
        Self {
            even_median_ms: stats.even_median * 1e3,
            even_std_ms: stats.even_std * 1e3,
            odd_median_ms: stats.odd_median * 1e3,
            odd_std_ms: stats.odd_std * 1e3,
        }
    }
}

/// One run's results.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MeasurementReport {
    /// Which test produced this report (drag, tap, screen, ...).
    pub test: String,
    /// Serial device of the probe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_device: Option<String>,
    /// Drag results, if this was a drag run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drag: Option<DragSummary>,
    /// Tap results, if this was a tap run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tap: Option<TapSummary>,
    /// Screen results, if this was a screen run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen: Option<ScreenSummary>,
}

impl MeasurementReport {
    /// Start a report for the named test.
    #[must_use]
    pub fn new(test: impl Into<String>) -> Self {
        Self {
            test: test.into(),
            ..Self::default()
        }
    }

    /// Attach drag results from crossing latencies (seconds) and an
    /// optional grid-search shift (seconds).
    #[must_use]
    pub fn with_drag(mut self, shift: Option<f64>, crossing_latencies: &[f64]) -> Self {
        let latencies_ms: Vec<f64> = crossing_latencies.iter().map(|l| l * 1e3).collect();
        let crossing_median_ms = if latencies_ms.is_empty() {
            None
        } else {
            Some(median(&latencies_ms))
        };
        self.drag = Some(DragSummary {
            shift_ms: shift.map(|s| s * 1e3),
            crossing_latencies_ms: latencies_ms,
            crossing_median_ms,
        });
        self
    }

    /// Attach screen results.
    #[must_use]
    pub fn with_screen(mut self, stats: &BlinkStats) -> Self {
        self.screen = Some(ScreenSummary::from(stats));
        self
    }

    /// Serialize as pretty JSON.
    ///
    /// # Errors
    /// Propagates serializer failures.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_report_shape() {
        let report = MeasurementReport::new("drag").with_drag(Some(0.015), &[0.010, 0.020]);
        let json = report.to_json().unwrap();

        let parsed: MeasurementReport = serde_json::from_str(&json).unwrap();
        let drag = parsed.drag.unwrap();
        assert_eq!(parsed.test, "drag");
        assert!((drag.shift_ms.unwrap() - 15.0).abs() < 1e-9);
        assert!((drag.crossing_median_ms.unwrap() - 15.0).abs() < 1e-9);
        assert!(parsed.tap.is_none());
    }

    #[test]
    fn test_empty_latencies_have_no_median() {
        let report = MeasurementReport::new("drag").with_drag(None, &[]);
        assert!(report.drag.unwrap().crossing_median_ms.is_none());
    }
}
