//! Shared host/probe clock reference.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::link::RoundTrip;

/// The established time reference between host and probe.
///
/// `base` is the host instant corresponding to the probe's clock zero.
/// Writing `local = remote + lag` for times relative to `base`, the true
/// (unknown, drifting) offset is bounded by `[min_lag, max_lag]` as of the
/// last sync exchange. The invariant `min_lag <= max_lag` always holds;
/// after a bridge `sync` the state is normalized so `min_lag == 0`.
#[derive(Debug, Clone, Copy)]
pub struct ClockState {
    base_instant: Instant,
    base_wall: SystemTime,
    min_lag: f64,
    max_lag: f64,
}

impl ClockState {
    /// Build the state from an accepted zero-clock round trip: the base is
    /// the send instant, the round trip bounds the lag from above.
    pub(crate) fn from_zero(rt: &RoundTrip) -> Self {
        Self {
            base_instant: rt.sent_at,
            base_wall: rt.sent_wall,
            min_lag: 0.0,
            max_lag: rt.elapsed.as_secs_f64(),
        }
    }

    /// Host instant of the probe's clock zero.
    #[must_use]
    pub fn base_instant(&self) -> Instant {
        self.base_instant
    }

    /// Wall-clock time of the probe's clock zero.
    #[must_use]
    pub fn base_wall(&self) -> SystemTime {
        self.base_wall
    }

    /// Wall-clock time of the probe's clock zero, microseconds since the
    /// Unix epoch. This is the `base` field of the bridge clock reply.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn base_wall_micros(&self) -> i64 {
        self.base_wall
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_micros() as i64)
    }

    /// Seconds elapsed on the host clock since the base instant.
    #[must_use]
    pub fn host_elapsed(&self) -> f64 {
        self.base_instant.elapsed().as_secs_f64()
    }

    /// Lower bound on the host-minus-remote offset, seconds.
    #[must_use]
    pub fn min_lag(&self) -> f64 {
        self.min_lag
    }

    /// Upper bound on the host-minus-remote offset, seconds.
    #[must_use]
    pub fn max_lag(&self) -> f64 {
        self.max_lag
    }

    /// Lower lag bound in microseconds.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn min_lag_micros(&self) -> i64 {
        (self.min_lag * 1e6).round() as i64
    }

    /// Upper lag bound in microseconds.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn max_lag_micros(&self) -> i64 {
        (self.max_lag * 1e6).round() as i64
    }

    /// Width of the current lag window, seconds.
    #[must_use]
    pub fn lag_window(&self) -> f64 {
        self.max_lag - self.min_lag
    }

    /// Store freshly estimated lag bounds, preserving `min <= max`.
    pub(crate) fn set_lag_bounds(&mut self, min_lag: f64, max_lag: f64) {
        debug_assert!(min_lag <= max_lag, "lag bounds out of order");
        self.min_lag = min_lag.min(max_lag);
        self.max_lag = max_lag;
    }

    /// Shift the base so the lag window starts at zero.
    ///
    /// Used by the bridge `sync` command: clients on the other end treat
    /// the base as the exact remote zero, so the window is re-anchored at
    /// its lower bound.
    pub fn normalize(&mut self) {
        let shift = self.min_lag;
        self.base_instant = shift_instant(self.base_instant, shift);
        self.base_wall = shift_wall(self.base_wall, shift);
        self.max_lag -= shift;
        self.min_lag = 0.0;
    }

    /// Convert a remote timestamp (seconds since the probe zero) to host
    /// wall-clock time.
    #[must_use]
    pub fn remote_to_wall(&self, remote_seconds: f64) -> SystemTime {
        shift_wall(self.base_wall, remote_seconds)
    }
}

fn shift_instant(base: Instant, seconds: f64) -> Instant {
    if seconds >= 0.0 {
        base + Duration::from_secs_f64(seconds)
    } else {
        base - Duration::from_secs_f64(-seconds)
    }
}

fn shift_wall(base: SystemTime, seconds: f64) -> SystemTime {
    if seconds >= 0.0 {
        base + Duration::from_secs_f64(seconds)
    } else {
        base - Duration::from_secs_f64(-seconds)
    }
}
