//! Serial device link to the probe.
//!
//! A [`ProbeLink`] is the single point of serial I/O: one raw write channel,
//! one line-oriented read channel. The link performs no arbitration between
//! callers — whoever holds it must serialize access themselves. The bridge
//! module enforces the one-reader-at-a-time discipline for the concurrent
//! case.

pub mod command;
pub mod serial;
pub mod trigger;


use std::time::{Duration, Instant, SystemTime};

use async_trait::async_trait;
use tracing::trace;

use crate::error::LinkError;

pub use command::Command;
pub use serial::SerialLink;
pub use trigger::{TriggerEvent, TriggerKind};

/// One timed command/reply exchange with the probe.
///
/// Never persisted; feeds round-trip statistics and the zero-clock
/// acceptance test.
#[derive(Debug, Clone)]
pub struct RoundTrip {
    /// The command that was sent.
    pub command: Command,
    /// Monotonic instant the command was written.
    pub sent_at: Instant,
    /// Wall-clock time the command was written.
    pub sent_wall: SystemTime,
    /// The reply line, trailing newline stripped.
    pub reply: String,
    /// Wall-clock round trip.
    pub elapsed: Duration,
}

/// Serial channel to the probe.
///
/// `read_line` blocks until one full `\n`-terminated line is available or
/// the configured timeout elapses, in which case it returns an empty string.
/// An empty line means "no event", not an error.
#[async_trait]
pub trait ProbeLink: Send + Sync {
    /// Write raw bytes to the probe.
    async fn write_bytes(&self, data: &[u8]) -> Result<(), LinkError>;

    /// Read one line, without the trailing newline. Empty on timeout.
    async fn read_line(&self) -> Result<String, LinkError>;

    /// Discard any pending unread input.
    async fn flush_input(&self) -> Result<(), LinkError>;

    /// Send a single command and read its one reply line, timing the round
    /// trip.
    async fn send_command(&self, command: Command) -> Result<RoundTrip, LinkError> {
        let sent_at = Instant::now();
        let sent_wall = SystemTime::now();
        self.write_bytes(&[command.opcode()]).await?;
        let reply = self.read_line().await?;
        let elapsed = sent_at.elapsed();
        trace!(
            %command,
            round_trip_ms = elapsed.as_secs_f64() * 1e3,
            reply = reply.as_str(),
            "send_command"
        );
        Ok(RoundTrip {
            command,
            sent_at,
            sent_wall,
            reply,
            elapsed,
        })
    }
}
