//! Clock synchronization protocols.
//!
//! Two protocols, both layered on the device link:
//!
//! - **Simple zero-sync**: zero the probe clock and accept the host send
//!   instant as the shared reference, provided the round trip came back
//!   fast enough to bound the error.
//! - **Two-sided lag estimation**: an NTP-like bounded-offset exchange.
//!   Nine messages in each direction give a proven interval
//!   `[min_lag, max_lag]` containing the true host-minus-remote offset.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};

use super::state::ClockState;
use crate::error::SyncError;
use crate::link::{Command, ProbeLink};
use crate::types::SyncConfig;

/// Messages per direction in a lag estimation exchange. Fixed by the
/// firmware's sync buffer size.
const SYNC_SAMPLES: usize = 9;

/// A link whose median round trip exceeds this cannot support the timing
/// protocols at all.
const SLOW_LINK_LIMIT_MS: f64 = 2.0;

/// Round-trip statistics from a calibration burst.
#[derive(Debug, Clone, Copy)]
pub struct RoundTripStats {
    /// Fastest observed round trip.
    pub min: Duration,
    /// Median round trip.
    pub median: Duration,
    /// Slowest observed round trip.
    pub max: Duration,
    /// Number of exchanges measured.
    pub count: u32,
}

/// Clock synchronization over a probe link.
///
/// Owns the [`ClockState`]; the state is unset until a successful
/// [`zero_clock`](Self::zero_clock) and is only ever mutated here.
pub struct ClockSync {
    link: Arc<dyn ProbeLink>,
    state: Option<ClockState>,
}

impl ClockSync {
    /// Create a synchronizer over the given link.
    #[must_use]
    pub fn new(link: Arc<dyn ProbeLink>) -> Self {
        Self { link, state: None }
    }

    /// The underlying link.
    #[must_use]
    pub fn link(&self) -> &Arc<dyn ProbeLink> {
        &self.link
    }

    /// The current clock state, if a zero has succeeded.
    #[must_use]
    pub fn state(&self) -> Option<&ClockState> {
        self.state.as_ref()
    }

    /// Mutable access to the clock state (bridge sync normalization).
    #[must_use]
    pub fn state_mut(&mut self) -> Option<&mut ClockState> {
        self.state.as_mut()
    }

    /// Measure the serial round trip with `exchanges` time-now commands.
    ///
    /// Zeroes the probe clock first; the first exchange after a quiet
    /// period is often slower, so this doubles as a channel warm-up.
    ///
    /// # Errors
    /// [`SyncError::SlowLink`] if the median round trip exceeds 2 ms —
    /// fatal, since no timing guarantee can hold on such a link.
    pub async fn comm_stats(&self, exchanges: u32) -> Result<RoundTripStats, SyncError> {
        debug!(exchanges, "measuring serial round-trip statistics");
        self.link.flush_input().await?;
        self.link.send_command(Command::ZeroClock).await?;

        let mut times = Vec::with_capacity(exchanges as usize);
        for _ in 0..exchanges {
            let rt = self.link.send_command(Command::TimeNow).await?;
            times.push(rt.elapsed);
        }
        times.sort_unstable();

        let stats = RoundTripStats {
            min: times.first().copied().unwrap_or_default(),
            median: median_duration(&times),
            max: times.last().copied().unwrap_or_default(),
            count: exchanges,
        };
        debug!(
            min_ms = stats.min.as_secs_f64() * 1e3,
            median_ms = stats.median.as_secs_f64() * 1e3,
            max_ms = stats.max.as_secs_f64() * 1e3,
            "serial round-trip stats"
        );

        let median_ms = stats.median.as_secs_f64() * 1e3;
        if median_ms > SLOW_LINK_LIMIT_MS {
            return Err(SyncError::SlowLink {
                median_ms,
                limit_ms: SLOW_LINK_LIMIT_MS,
            });
        }
        Ok(stats)
    }

    /// Zero the probe clock and establish the shared reference.
    ///
    /// Runs the warm-up calibration burst, then up to `cfg.retries`
    /// zero-clock attempts. The first attempt whose round trip stays under
    /// `cfg.max_delay` wins: the send instant becomes the base time, with
    /// `min_lag = 0` and `max_lag` equal to the round trip. A slow reply
    /// means the send instant is not a tight bound on the remote zero, so
    /// slow attempts are never accepted.
    ///
    /// # Errors
    /// [`SyncError::SlowLink`] from the calibration burst, or
    /// [`SyncError::ZeroFailed`] when every attempt missed the deadline.
    pub async fn zero_clock(&mut self, cfg: &SyncConfig) -> Result<&ClockState, SyncError> {
        self.comm_stats(cfg.warmup_exchanges).await?;
        self.link.flush_input().await?;

        for attempt in 1..=cfg.retries {
            let rt = self.link.send_command(Command::ZeroClock).await?;
            if rt.elapsed < cfg.max_delay {
                info!(
                    attempt,
                    round_trip_ms = rt.elapsed.as_secs_f64() * 1e3,
                    "clock zeroed"
                );
                return Ok(self.state.insert(ClockState::from_zero(&rt)));
            }
            debug!(
                attempt,
                round_trip_ms = rt.elapsed.as_secs_f64() * 1e3,
                "zero attempt too slow, retrying"
            );
        }
        Err(SyncError::ZeroFailed {
            retries: cfg.retries,
        })
    }

    /// Refine the lag bounds with a two-sided exchange.
    ///
    /// Remote→host: one sync-send makes the probe emit nine lines,
    /// recording its send stamp for each; every host arrival time is an
    /// upper bound on the lag, and the tightest one wins. Host→remote:
    /// nine numbered one-byte messages, spaced by a randomized 70–700 µs
    /// to defeat buffering; every host send time is a lower bound, and the
    /// loosest one is the tightest valid lower bound.
    ///
    /// The true offset is guaranteed to lie in the returned
    /// `[min_lag, max_lag]` immediately after this call; clock drift widens
    /// the window afterwards, so callers needing fresh bounds re-run it.
    ///
    /// # Errors
    /// [`SyncError::NotZeroed`] without a prior successful zero;
    /// [`SyncError::MalformedReadout`] on an undecodable readout line.
    pub async fn estimate_lag(&mut self) -> Result<(f64, f64), SyncError> {
        let Some(base) = self.state.map(|s| s.base_instant()) else {
            return Err(SyncError::NotZeroed);
        };
        self.link.flush_input().await?;

        // Remote -> host: the probe sends, we timestamp arrivals.
        let mut local_received = [0.0_f64; SYNC_SAMPLES];
        self.link
            .write_bytes(&[Command::SyncSend.opcode()])
            .await
            .map_err(SyncError::from)?;
        for slot in &mut local_received {
            let _line = self.link.read_line().await?;
            *slot = base.elapsed().as_secs_f64();
        }
        let remote_sent = Self::read_remote_times(&self.link).await?;
        let max_lag = local_received
            .iter()
            .zip(&remote_sent)
            .map(|(local, remote)| local - remote)
            .fold(f64::INFINITY, f64::min);

        // Host -> remote: we send numbered messages, the probe timestamps
        // receipt.
        let mut local_sent = [0.0_f64; SYNC_SAMPLES];
        for (i, slot) in local_sent.iter_mut().enumerate() {
            let spacing = {
                let mut rng = rand::thread_rng();
                rng.gen_range(70..=700_u64)
            };
            tokio::time::sleep(Duration::from_micros(spacing)).await;
            *slot = base.elapsed().as_secs_f64();
            self.link
                .write_bytes(format!("{}", i + 1).as_bytes())
                .await
                .map_err(SyncError::from)?;
        }
        let remote_received = Self::read_remote_times(&self.link).await?;
        let mut min_lag = local_sent
            .iter()
            .zip(&remote_received)
            .map(|(local, remote)| local - remote)
            .fold(f64::NEG_INFINITY, f64::max);

        if min_lag > max_lag {
            // Cannot happen with honest timestamps; clamp rather than store
            // an inverted window.
            warn!(min_lag, max_lag, "lag bounds inverted, clamping");
            min_lag = max_lag;
        }

        let state = self.state.as_mut().ok_or(SyncError::NotZeroed)?;
        state.set_lag_bounds(min_lag, max_lag);
        debug!(
            min_lag_us = state.min_lag_micros(),
            max_lag_us = state.max_lag_micros(),
            "lag bounds estimated"
        );
        Ok((min_lag, max_lag))
    }

    /// Read back the probe's nine recorded sync timestamps.
    ///
    /// Each reply must decode as `<index>:<timestamp_us>` with a 1-based
    /// index matching its position in the readout sequence.
    async fn read_remote_times(
        link: &Arc<dyn ProbeLink>,
    ) -> Result<[f64; SYNC_SAMPLES], SyncError> {
        let mut times = [0.0_f64; SYNC_SAMPLES];
        for (i, slot) in times.iter_mut().enumerate() {
            let rt = link.send_command(Command::SyncReadout).await?;
            let line = rt.reply.trim();
            let malformed = || SyncError::MalformedReadout {
                line: line.to_string(),
            };
            let (index, stamp) = line.split_once(':').ok_or_else(malformed)?;
            let index: usize = index.trim().parse().map_err(|_| malformed())?;
            if index != i + 1 {
                return Err(malformed());
            }
            let t_us: f64 = stamp.trim().parse().map_err(|_| malformed())?;
            *slot = t_us * 1e-6;
        }
        Ok(times)
    }
}

fn median_duration(sorted: &[Duration]) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2
    }
}
