//! Core configuration types.

use std::time::Duration;

/// Configuration for the serial link to the probe.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Path of the serial device, e.g. `/dev/ttyACM0`.
    pub device: String,
    /// Baud rate. Fixed by the probe firmware.
    pub baud_rate: u32,
    /// Read timeout for `read_line`. `None` blocks indefinitely; with a
    /// timeout an expired read yields an empty line ("no event").
    pub read_timeout: Option<Duration>,
}

impl LinkConfig {
    /// Baud rate the probe firmware runs at.
    pub const BAUD_RATE: u32 = 115_200;

    /// Create a config for the given device with no read timeout.
    #[must_use]
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            baud_rate: Self::BAUD_RATE,
            read_timeout: None,
        }
    }

    /// Set the read timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }
}

/// Policy for the simple zero-clock protocol.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// A zero attempt is accepted only if its round trip stays under this.
    pub max_delay: Duration,
    /// Number of zero attempts before giving up.
    pub retries: u32,
    /// Number of exchanges in the warm-up calibration burst.
    pub warmup_exchanges: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_delay: Duration::from_millis(1),
            retries: 10,
            warmup_exchanges: 10,
        }
    }
}

/// Configuration for the TCP bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address to bind the listener on.
    pub host: String,
    /// Port to listen on. Use 0 to let the OS pick (tests).
    pub port: u16,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 50_007,
        }
    }
}

impl BridgeConfig {
    /// The socket address string to bind, binding all interfaces when the
    /// host is empty.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        let host = if self.host.is_empty() {
            "0.0.0.0"
        } else {
            &self.host
        };
        format!("{host}:{}", self.port)
    }
}
