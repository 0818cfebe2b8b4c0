//! Serial implementation of the probe link.

use std::time::Duration;

use futures::StreamExt;
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tokio_serial::SerialStream;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::debug;

use super::ProbeLink;
use crate::error::LinkError;
use crate::types::LinkConfig;

/// Serial link to the probe.
///
/// The port is split into a line-framed read half and a raw write half,
/// each behind its own lock, so a command write can go out while a blocking
/// line read is parked. There is no arbitration between multiple readers;
/// see the bridge module for the concurrent case.
pub struct SerialLink {
    reader: Mutex<FramedRead<ReadHalf<SerialStream>, LinesCodec>>,
    writer: Mutex<WriteHalf<SerialStream>>,
    read_timeout: Option<Duration>,
    device: String,
}

impl SerialLink {
    /// Open the serial device described by `config`.
    ///
    /// # Errors
    /// Returns [`LinkError::Open`] if the device cannot be opened. This is
    /// fatal for any measurement run.
    pub fn open(config: &LinkConfig) -> Result<Self, LinkError> {
        let builder = tokio_serial::new(&config.device, config.baud_rate);
        let stream = SerialStream::open(&builder).map_err(|source| LinkError::Open {
            device: config.device.clone(),
            source,
        })?;
        debug!(device = config.device.as_str(), baud = config.baud_rate, "serial link open");
        let (read_half, write_half) = tokio::io::split(stream);
        Ok(Self {
            reader: Mutex::new(FramedRead::new(read_half, LinesCodec::new())),
            writer: Mutex::new(write_half),
            read_timeout: config.read_timeout,
            device: config.device.clone(),
        })
    }

    /// Path of the underlying serial device.
    #[must_use]
    pub fn device(&self) -> &str {
        &self.device
    }
}

#[async_trait::async_trait]
impl ProbeLink for SerialLink {
    async fn write_bytes(&self, data: &[u8]) -> Result<(), LinkError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(data).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn read_line(&self) -> Result<String, LinkError> {
        let mut reader = self.reader.lock().await;
        let item = match self.read_timeout {
            Some(limit) => match tokio::time::timeout(limit, reader.next()).await {
                Ok(item) => item,
                // Timeout is "no event", not an error.
                Err(_) => return Ok(String::new()),
            },
            None => reader.next().await,
        };
        match item {
            // The probe terminates lines with \r\n; the codec strips only \n.
            Some(Ok(line)) => Ok(line.trim_end().to_string()),
            Some(Err(LinesCodecError::Io(e))) => Err(LinkError::Io(e)),
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => Err(LinkError::Io(
                std::io::Error::new(std::io::ErrorKind::InvalidData, "line too long"),
            )),
            None => Err(LinkError::Closed),
        }
    }

    async fn flush_input(&self) -> Result<(), LinkError> {
        let mut reader = self.reader.lock().await;
        // Drain whatever has already arrived. Lines still in flight on the
        // wire are the caller's problem, same as a kernel-buffer flush.
        loop {
            match tokio::time::timeout(Duration::from_millis(1), reader.next()).await {
                Ok(Some(Ok(_))) => {}
                Ok(Some(Err(LinesCodecError::Io(e)))) => return Err(LinkError::Io(e)),
                Ok(Some(Err(LinesCodecError::MaxLineLengthExceeded))) | Err(_) => return Ok(()),
                Ok(None) => return Err(LinkError::Closed),
            }
        }
    }
}
