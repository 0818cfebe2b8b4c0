//! High-level probe operations.
//!
//! [`ProbeClient`] wraps the raw link with named operations for the test
//! runners: reset, version, shock readout, sensor sampling, trigger
//! streaming. Clock synchronization lives in the owned [`ClockSync`].


use std::sync::Arc;

use tracing::debug;

use crate::clock::ClockSync;
use crate::error::ProbeError;
use crate::link::{Command, ProbeLink, TriggerEvent};

/// Which sensor's automatic trigger stream to toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerStream {
    /// Laser gate transitions.
    Laser,
    /// Screen photodiode transitions.
    Screen,
}

/// High-level client for the probe.
pub struct ProbeClient {
    link: Arc<dyn ProbeLink>,
    clock: ClockSync,
}

impl ProbeClient {
    /// Create a client over the given link.
    #[must_use]
    pub fn new(link: Arc<dyn ProbeLink>) -> Self {
        let clock = ClockSync::new(Arc::clone(&link));
        Self { link, clock }
    }

    /// The underlying link.
    #[must_use]
    pub fn link(&self) -> &Arc<dyn ProbeLink> {
        &self.link
    }

    /// Clock synchronization state and protocols.
    #[must_use]
    pub fn clock(&self) -> &ClockSync {
        &self.clock
    }

    /// Mutable clock access for running sync protocols.
    pub fn clock_mut(&mut self) -> &mut ClockSync {
        &mut self.clock
    }

    /// Reset the probe state. Returns the banner line the firmware prints.
    ///
    /// # Errors
    /// Propagates link failures.
    pub async fn reset(&self) -> Result<String, ProbeError> {
        let rt = self.link.send_command(Command::Reset).await?;
        Ok(rt.reply)
    }

    /// Firmware version line.
    ///
    /// # Errors
    /// Propagates link failures.
    pub async fn version(&self) -> Result<String, ProbeError> {
        let rt = self.link.send_command(Command::Version).await?;
        Ok(rt.reply)
    }

    /// The probe's clock reading, seconds since its last zero.
    ///
    /// # Errors
    /// [`ProbeError::UnexpectedReply`] if the reply is not a microsecond
    /// count.
    pub async fn time_now(&self) -> Result<f64, ProbeError> {
        let rt = self.link.send_command(Command::TimeNow).await?;
        let t_us: f64 = rt
            .reply
            .trim()
            .parse()
            .map_err(|_| ProbeError::UnexpectedReply {
                command: Command::TimeNow,
                reply: rt.reply.clone(),
            })?;
        Ok(t_us * 1e-6)
    }

    /// Read and clear the shock sensor timestamp.
    ///
    /// Returns the shock time in seconds since the probe zero, or `None`
    /// when no shock was recorded — the caller skips the sample, this is
    /// not an error.
    ///
    /// # Errors
    /// [`ProbeError::UnexpectedReply`] if the reply is not an integer.
    #[allow(clippy::cast_precision_loss)]
    pub async fn read_shock_time(&self) -> Result<Option<f64>, ProbeError> {
        let rt = self.link.send_command(Command::ShockRead).await?;
        let t_us: i64 = rt
            .reply
            .trim()
            .parse()
            .map_err(|_| ProbeError::UnexpectedReply {
                command: Command::ShockRead,
                reply: rt.reply.clone(),
            })?;
        if t_us == 0 {
            return Ok(None);
        }
        Ok(Some(t_us as f64 * 1e-6))
    }

    /// Sample every analog sensor once. Returns the integer readings in
    /// the order the firmware prints them.
    ///
    /// # Errors
    /// Propagates link failures.
    pub async fn sample_all(&self) -> Result<Vec<u32>, ProbeError> {
        let rt = self.link.send_command(Command::SampleAll).await?;
        Ok(parse_integer_runs(&rt.reply))
    }

    /// Turn a sensor's automatic trigger stream on or off.
    ///
    /// # Errors
    /// Propagates link failures.
    pub async fn set_trigger_stream(
        &self,
        stream: TriggerStream,
        enabled: bool,
    ) -> Result<(), ProbeError> {
        let command = match (stream, enabled) {
            (TriggerStream::Laser, true) => Command::AutoLaserOn,
            (TriggerStream::Laser, false) => Command::AutoLaserOff,
            (TriggerStream::Screen, true) => Command::AutoScreenOn,
            (TriggerStream::Screen, false) => Command::AutoScreenOff,
        };
        debug!(?stream, enabled, "toggling trigger stream");
        self.link.send_command(command).await?;
        Ok(())
    }

    /// Block for the next trigger line and parse it.
    ///
    /// `None` on a read timeout ("no event"); a malformed line is an error
    /// for the caller to skip or abort on.
    ///
    /// # Errors
    /// [`ProbeError::Trigger`] on a malformed line, link errors otherwise.
    pub async fn next_trigger(&self) -> Result<Option<TriggerEvent>, ProbeError> {
        let line = self.link.read_line().await?;
        if line.is_empty() {
            return Ok(None);
        }
        Ok(Some(TriggerEvent::parse(&line)?))
    }

    /// Emit an audio beep and return its trigger event, if one arrives
    /// before the read timeout.
    ///
    /// # Errors
    /// [`ProbeError::Trigger`] on a malformed trigger line.
    pub async fn beep(&self) -> Result<Option<TriggerEvent>, ProbeError> {
        self.link.send_command(Command::Audio).await?;
        self.next_trigger().await
    }

    /// Request the screen brightness curve and collect lines until the
    /// stream goes quiet. Requires a link with a read timeout configured.
    ///
    /// # Errors
    /// Propagates link failures.
    pub async fn brightness_curve(&self) -> Result<Vec<String>, ProbeError> {
        let rt = self.link.send_command(Command::BrightnessCurve).await?;
        let mut lines = vec![rt.reply];
        loop {
            let line = self.link.read_line().await?;
            if line.is_empty() {
                break;
            }
            lines.push(line);
        }
        Ok(lines)
    }
}

/// Pull every run of decimal digits out of a reply line.
fn parse_integer_runs(reply: &str) -> Vec<u32> {
    reply
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}
