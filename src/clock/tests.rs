use std::sync::Arc;
use std::time::Duration;

use crate::clock::ClockSync;
use crate::error::SyncError;
use crate::testing::MockLink;
use crate::types::SyncConfig;

fn sync_over(link: &Arc<MockLink>) -> ClockSync {
    ClockSync::new(Arc::clone(link) as Arc<dyn crate::link::ProbeLink>)
}

/// Writes issued by the warm-up burst: one zero-clock plus ten time-now
/// exchanges.
const WARMUP_WRITES: usize = 11;

#[tokio::test]
async fn test_zero_clock_sets_tight_bounds() {
    let link = Arc::new(MockLink::new());
    let mut sync = sync_over(&link);

    let state = sync.zero_clock(&SyncConfig::default()).await.unwrap();
    assert!((state.min_lag() - 0.0).abs() < f64::EPSILON);
    assert!(state.max_lag() >= 0.0);
    assert!(state.max_lag() < 0.001, "round trip bound {}", state.max_lag());
    assert!(state.host_elapsed() >= 0.0);
}

#[tokio::test]
async fn test_zero_clock_never_accepts_slow_attempts() {
    let link = Arc::new(MockLink::new());
    // Fast warm-up, then every zero attempt slower than the 1 ms deadline.
    link.queue_latencies(
        std::iter::repeat(Duration::ZERO)
            .take(WARMUP_WRITES)
            .chain(std::iter::repeat(Duration::from_millis(2)).take(10)),
    );
    let mut sync = sync_over(&link);

    let err = sync.zero_clock(&SyncConfig::default()).await.unwrap_err();
    assert!(matches!(err, SyncError::ZeroFailed { retries: 10 }));
    assert!(sync.state().is_none());
}

#[tokio::test]
async fn test_zero_clock_retries_until_fast_round_trip() {
    let link = Arc::new(MockLink::new());
    // First zero attempt too slow, second fast.
    link.queue_latencies(
        std::iter::repeat(Duration::ZERO)
            .take(WARMUP_WRITES)
            .chain([Duration::from_millis(3), Duration::ZERO]),
    );
    let mut sync = sync_over(&link);

    let state = sync.zero_clock(&SyncConfig::default()).await.unwrap();
    assert!(state.max_lag() < 0.001);
}

#[tokio::test]
async fn test_slow_link_is_fatal() {
    let link = Arc::new(MockLink::new());
    link.set_latency(Duration::from_millis(3));
    let mut sync = sync_over(&link);

    let err = sync.zero_clock(&SyncConfig::default()).await.unwrap_err();
    assert!(matches!(err, SyncError::SlowLink { .. }));
}

#[tokio::test]
async fn test_comm_stats_reflect_link_latency() {
    let link = Arc::new(MockLink::new());
    link.set_latency(Duration::from_millis(1));
    let sync = sync_over(&link);

    let stats = sync.comm_stats(10).await.unwrap();
    assert_eq!(stats.count, 10);
    assert!(stats.min >= Duration::from_millis(1));
    assert!(stats.median >= stats.min);
    assert!(stats.max >= stats.median);
}

#[tokio::test]
async fn test_estimate_lag_requires_zeroed_clock() {
    let link = Arc::new(MockLink::new());
    let mut sync = sync_over(&link);

    let err = sync.estimate_lag().await.unwrap_err();
    assert!(matches!(err, SyncError::NotZeroed));
}

#[tokio::test]
async fn test_estimate_lag_brackets_a_skewed_remote_clock() {
    let link = Arc::new(MockLink::new());
    // Remote clock runs 50 ms behind: host-minus-remote lag is +50 ms.
    link.set_clock_skew_us(-50_000);
    let mut sync = sync_over(&link);

    sync.zero_clock(&SyncConfig::default()).await.unwrap();
    let (min_lag, max_lag) = sync.estimate_lag().await.unwrap();

    assert!(min_lag <= max_lag);
    assert!(max_lag >= 0.049, "max_lag {max_lag}");
    assert!(min_lag <= 0.051, "min_lag {min_lag}");
    // The window stays tight over a fast mock link.
    assert!(max_lag - min_lag < 0.02);
}

#[tokio::test]
async fn test_repeated_estimates_keep_bounds_ordered() {
    let link = Arc::new(MockLink::new());
    let mut sync = sync_over(&link);
    sync.zero_clock(&SyncConfig::default()).await.unwrap();

    for _ in 0..3 {
        let (min_lag, max_lag) = sync.estimate_lag().await.unwrap();
        assert!(min_lag <= max_lag);
        let state = sync.state().unwrap();
        assert!(state.min_lag() <= state.max_lag());
    }
}

#[tokio::test]
async fn test_malformed_readout_is_an_error() {
    let link = Arc::new(MockLink::new());
    let mut sync = sync_over(&link);
    sync.zero_clock(&SyncConfig::default()).await.unwrap();

    link.set_corrupt_readouts(true);
    let err = sync.estimate_lag().await.unwrap_err();
    assert!(matches!(err, SyncError::MalformedReadout { .. }));
}

#[tokio::test]
async fn test_remote_timestamps_convert_against_the_base() {
    let link = Arc::new(MockLink::new());
    let mut sync = sync_over(&link);
    let state = *sync.zero_clock(&SyncConfig::default()).await.unwrap();

    let wall = state.remote_to_wall(1.5);
    let delta = wall
        .duration_since(state.base_wall())
        .expect("converted time precedes the base");
    assert!((delta.as_secs_f64() - 1.5).abs() < 1e-6);
}

#[tokio::test]
async fn test_normalize_anchors_window_at_zero() {
    let link = Arc::new(MockLink::new());
    link.set_clock_skew_us(-50_000);
    let mut sync = sync_over(&link);
    sync.zero_clock(&SyncConfig::default()).await.unwrap();
    sync.estimate_lag().await.unwrap();

    let before = *sync.state().unwrap();
    let window = before.lag_window();
    let base_us = before.base_wall_micros();

    let state = sync.state_mut().unwrap();
    state.normalize();
    assert!((state.min_lag() - 0.0).abs() < 1e-12);
    assert!((state.lag_window() - window).abs() < 1e-9);
    // The base moved by the old lower bound.
    let shift_us = state.base_wall_micros() - base_us;
    assert!((shift_us - before.min_lag_micros()).abs() <= 1);
}
