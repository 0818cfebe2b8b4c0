//! Screen blink response statistics.
//!
//! The device under test toggles the screen between black and white on
//! vsync while the probe's photodiode reports each physical transition.
//! Pairing the two ordered sequences gives one response time per blink;
//! black-to-white and white-to-black transitions are reported separately
//! since panels respond asymmetrically.

use tracing::debug;

use super::stats::{median, std_dev};

/// Screen response statistics, split by transition parity.
#[derive(Debug, Clone)]
pub struct BlinkStats {
    /// Per-blink response times, seconds, in blink order.
    pub deltas: Vec<f64>,
    /// Median of even-indexed transitions, seconds.
    pub even_median: f64,
    /// Standard deviation of even-indexed transitions, seconds.
    pub even_std: f64,
    /// Median of odd-indexed transitions, seconds.
    pub odd_median: f64,
    /// Standard deviation of odd-indexed transitions, seconds.
    pub odd_std: f64,
}

/// Pair blink (vsync) times with photodiode times and compute response
/// statistics.
///
/// Sensor readings earlier than the first blink are discarded (the sensor
/// may have been attached late); the sequences are truncated to their
/// common length and the first pair is skipped as warm-up. Returns `None`
/// when nothing remains to pair.
#[must_use]
pub fn blink_response(blink_times: &[f64], sensor_times: &[f64]) -> Option<BlinkStats> {
    let first_blink = *blink_times.first()?;
    let skipped = sensor_times
        .iter()
        .take_while(|&&t| t < first_blink)
        .count();
    if skipped > 0 {
        debug!(skipped, "discarded sensor readings before the first blink");
    }
    let sensor = &sensor_times[skipped..];

    let length = sensor.len().min(blink_times.len());
    if length <= 1 {
        return None;
    }
    // The first blink is often weird; skip it.
    let deltas: Vec<f64> = sensor[1..length]
        .iter()
        .zip(&blink_times[1..length])
        .map(|(s, b)| s - b)
        .collect();

    let even: Vec<f64> = deltas.iter().step_by(2).copied().collect();
    let odd: Vec<f64> = deltas.iter().skip(1).step_by(2).copied().collect();

    Some(BlinkStats {
        even_median: median(&even),
        even_std: std_dev(&even),
        odd_median: median(&odd),
        odd_std: std_dev(&odd),
        deltas,
    })
}
