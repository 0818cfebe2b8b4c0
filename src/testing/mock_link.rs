//! In-memory probe link with firmware-like behavior.
//!
//! [`MockLink`] emulates enough of the probe firmware to drive the clock
//! sync protocols and the bridge end to end: it answers every opcode,
//! records sync timestamps the way the real device does, and lets tests
//! inject trigger lines and artificial reply latency.

use std::collections::VecDeque;
use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};

use tokio::sync::Notify;

use crate::error::LinkError;
use crate::link::{Command, ProbeLink};

/// Internal fake-firmware state.
struct FirmwareState {
    /// Instant the fake clock was last zeroed.
    zeroed_at: Instant,
    /// Artificial skew added to every remote timestamp, in microseconds.
    skew_us: i64,
    /// The nine recorded sync timestamps (microseconds, remote clock).
    sync_times: Vec<i64>,
    /// Next sync-readout slot.
    sync_read_pos: usize,
    /// Pending shock timestamp in microseconds; 0 means "no event".
    shock_time_us: i64,
    /// When set, sync readouts reply garbage instead of `<i>:<t>`.
    corrupt_readouts: bool,
    /// Whether laser auto-triggering is on.
    auto_laser: bool,
    /// Whether screen auto-triggering is on.
    auto_screen: bool,
}

/// A scripted in-memory probe.
pub struct MockLink {
    state: StdMutex<FirmwareState>,
    /// Reply lines waiting to be read.
    queue: StdMutex<VecDeque<String>>,
    notify: Notify,
    /// Journal of every write, verbatim.
    writes: StdMutex<Vec<Vec<u8>>>,
    /// Journal of every line handed to a reader.
    reads: StdMutex<Vec<String>>,
    /// Per-write artificial latency schedule; falls back to `latency`.
    latency_schedule: StdMutex<VecDeque<Duration>>,
    latency: StdMutex<Duration>,
    read_timeout: Option<Duration>,
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLink {
    /// Create a mock link with no read timeout and no reply latency.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: StdMutex::new(FirmwareState {
                zeroed_at: Instant::now(),
                skew_us: 0,
                sync_times: vec![0; 9],
                sync_read_pos: 9,
                shock_time_us: 0,
                corrupt_readouts: false,
                auto_laser: false,
                auto_screen: false,
            }),
            queue: StdMutex::new(VecDeque::new()),
            notify: Notify::new(),
            writes: StdMutex::new(Vec::new()),
            reads: StdMutex::new(Vec::new()),
            latency_schedule: StdMutex::new(VecDeque::new()),
            latency: StdMutex::new(Duration::ZERO),
            read_timeout: None,
        }
    }

    /// Create a mock link whose `read_line` gives up after `timeout`.
    #[must_use]
    pub fn with_read_timeout(timeout: Duration) -> Self {
        Self {
            read_timeout: Some(timeout),
            ..Self::new()
        }
    }

    /// Set the default artificial latency applied to every exchange.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    /// Queue one-shot latencies consumed in order by subsequent writes.
    pub fn queue_latencies(&self, latencies: impl IntoIterator<Item = Duration>) {
        self.latency_schedule.lock().unwrap().extend(latencies);
    }

    /// Skew the fake remote clock by `skew_us` microseconds.
    pub fn set_clock_skew_us(&self, skew_us: i64) {
        self.state.lock().unwrap().skew_us = skew_us;
    }

    /// Arm the shock sensor with a timestamp to report on the next read.
    pub fn set_shock_time_us(&self, t_us: i64) {
        self.state.lock().unwrap().shock_time_us = t_us;
    }

    /// Make sync readouts reply garbage, for decoder failure paths.
    pub fn set_corrupt_readouts(&self, corrupt: bool) {
        self.state.lock().unwrap().corrupt_readouts = corrupt;
    }

    /// Whether laser auto-triggering is currently enabled.
    #[must_use]
    pub fn auto_laser(&self) -> bool {
        self.state.lock().unwrap().auto_laser
    }

    /// Whether screen auto-triggering is currently enabled.
    #[must_use]
    pub fn auto_screen(&self) -> bool {
        self.state.lock().unwrap().auto_screen
    }

    /// Inject a line as if the probe had pushed it spontaneously.
    pub fn push_line(&self, line: impl Into<String>) {
        self.queue.lock().unwrap().push_back(line.into());
        self.notify.notify_one();
    }

    /// Everything written to the link so far.
    #[must_use]
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }

    /// Every line handed out by `read_line` so far.
    #[must_use]
    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }

    /// Remote clock reading in microseconds, skew included.
    fn remote_now_us(state: &FirmwareState) -> i64 {
        i64::try_from(state.zeroed_at.elapsed().as_micros()).unwrap_or(i64::MAX) + state.skew_us
    }

    /// Process one written byte the way the firmware's command loop would.
    fn handle_byte(&self, byte: u8, replies: &mut Vec<String>) {
        let mut state = self.state.lock().unwrap();
        if let Some(cmd) = Command::from_opcode(byte) {
            match cmd {
                Command::Reset => {
                    state.auto_laser = false;
                    state.auto_screen = false;
                    state.shock_time_us = 0;
                    replies.push("latimer-probe reset".to_string());
                }
                Command::Ping => replies.push("pong".to_string()),
                Command::ZeroClock => {
                    state.zeroed_at = Instant::now();
                    replies.push("z 0".to_string());
                }
                Command::SyncSend => {
                    // Nine spontaneous lines; the send stamp of each is
                    // recorded for later readout.
                    for i in 0..9 {
                        let stamp = Self::remote_now_us(&state);
                        state.sync_times[i] = stamp;
                        replies.push(format!("sync {}", i + 1));
                    }
                    state.sync_read_pos = 0;
                }
                Command::SyncReadout => {
                    if state.corrupt_readouts {
                        replies.push("garbage".to_string());
                    } else {
                        let pos = state.sync_read_pos.min(8);
                        let stamp = state.sync_times[pos];
                        replies.push(format!("{}:{stamp}", pos + 1));
                        state.sync_read_pos = (pos + 1).min(9);
                    }
                }
                Command::TimeNow => replies.push(format!("{}", Self::remote_now_us(&state))),
                Command::AutoLaserOn => {
                    state.auto_laser = true;
                    replies.push("ok".to_string());
                }
                Command::AutoLaserOff => {
                    state.auto_laser = false;
                    replies.push("ok".to_string());
                }
                Command::AutoScreenOn => {
                    state.auto_screen = true;
                    replies.push("ok".to_string());
                }
                Command::AutoScreenOff => {
                    state.auto_screen = false;
                    replies.push("ok".to_string());
                }
                Command::ShockRead => {
                    replies.push(format!("{}", state.shock_time_us));
                    state.shock_time_us = 0;
                }
                Command::Version => replies.push("v 6".to_string()),
                Command::SampleAll => replies.push("q 512 300 17".to_string()),
                Command::BrightnessCurve => {
                    replies.push("t0 100".to_string());
                    replies.push("t1 220".to_string());
                }
                Command::Audio => {
                    // Acknowledge, then report the beep as a trigger line.
                    let t = Self::remote_now_us(&state);
                    replies.push("a".to_string());
                    replies.push(format!("G A {t} 1 1"));
                }
            }
        } else if (b'1'..=b'9').contains(&byte) {
            // Numbered host->remote sync message: record the receive stamp
            // into the labeled slot.
            let slot = usize::from(byte - b'1');
            if slot == 0 {
                state.sync_times = vec![0; 9];
            }
            let stamp = Self::remote_now_us(&state);
            state.sync_times[slot] = stamp;
            state.sync_read_pos = 0;
        }
        // Anything else (forwarded payload bytes) is silently consumed.
    }

    fn next_latency(&self) -> Duration {
        self.latency_schedule
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| *self.latency.lock().unwrap())
    }
}

#[async_trait::async_trait]
impl ProbeLink for MockLink {
    async fn write_bytes(&self, data: &[u8]) -> Result<(), LinkError> {
        self.writes.lock().unwrap().push(data.to_vec());
        let latency = self.next_latency();
        if latency > Duration::ZERO {
            tokio::time::sleep(latency).await;
        }
        let mut replies = Vec::new();
        for &byte in data {
            self.handle_byte(byte, &mut replies);
        }
        if !replies.is_empty() {
            let mut queue = self.queue.lock().unwrap();
            for line in replies {
                queue.push_back(line);
                self.notify.notify_one();
            }
        }
        Ok(())
    }

    async fn read_line(&self) -> Result<String, LinkError> {
        let deadline = self.read_timeout.map(|t| Instant::now() + t);
        loop {
            let notified = self.notify.notified();
            if let Some(line) = self.queue.lock().unwrap().pop_front() {
                self.reads.lock().unwrap().push(line.clone());
                return Ok(line);
            }
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(String::new());
                    }
                    if tokio::time::timeout(deadline - now, notified).await.is_err() {
                        return Ok(String::new());
                    }
                }
                None => notified.await,
            }
        }
    }

    async fn flush_input(&self) -> Result<(), LinkError> {
        self.queue.lock().unwrap().clear();
        Ok(())
    }
}
