//! Single-character probe commands.
//!
//! The probe firmware speaks a fixed protocol: every command is one ASCII
//! character, every reply is one line of text. The set is closed; anything
//! else written to the port is either a bridge-forwarded payload or a
//! numbered sync message.

/// A command understood by the probe firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Reset the probe state (`F`).
    Reset,
    /// No-op ping (`P`).
    Ping,
    /// Zero the probe clock (`Z`).
    ZeroClock,
    /// Start the remote-to-host sync burst (`I`).
    SyncSend,
    /// Read out one recorded sync timestamp (`R`).
    SyncReadout,
    /// Report the probe clock, microseconds since zero (`T`).
    TimeNow,
    /// Enable automatic laser trigger lines (`L`).
    AutoLaserOn,
    /// Disable automatic laser trigger lines (`l`).
    AutoLaserOff,
    /// Enable automatic screen trigger lines (`C`).
    AutoScreenOn,
    /// Disable automatic screen trigger lines (`c`).
    AutoScreenOff,
    /// Read the last shock-sensor timestamp (`G`).
    ShockRead,
    /// Report the firmware version (`V`).
    Version,
    /// Sample every analog sensor once (`Q`).
    SampleAll,
    /// Stream the screen brightness curve (`U`).
    BrightnessCurve,
    /// Emit an audio beep and report its trigger (`A`).
    Audio,
}

impl Command {
    /// The opcode byte sent over the wire.
    #[must_use]
    pub fn opcode(self) -> u8 {
        match self {
            Command::Reset => b'F',
            Command::Ping => b'P',
            Command::ZeroClock => b'Z',
            Command::SyncSend => b'I',
            Command::SyncReadout => b'R',
            Command::TimeNow => b'T',
            Command::AutoLaserOn => b'L',
            Command::AutoLaserOff => b'l',
            Command::AutoScreenOn => b'C',
            Command::AutoScreenOff => b'c',
            Command::ShockRead => b'G',
            Command::Version => b'V',
            Command::SampleAll => b'Q',
            Command::BrightnessCurve => b'U',
            Command::Audio => b'A',
        }
    }

    /// Look up the command for an opcode byte.
    #[must_use]
    pub fn from_opcode(op: u8) -> Option<Self> {
        Some(match op {
            b'F' => Command::Reset,
            b'P' => Command::Ping,
            b'Z' => Command::ZeroClock,
            b'I' => Command::SyncSend,
            b'R' => Command::SyncReadout,
            b'T' => Command::TimeNow,
            b'L' => Command::AutoLaserOn,
            b'l' => Command::AutoLaserOff,
            b'C' => Command::AutoScreenOn,
            b'c' => Command::AutoScreenOff,
            b'G' => Command::ShockRead,
            b'V' => Command::Version,
            b'Q' => Command::SampleAll,
            b'U' => Command::BrightnessCurve,
            b'A' => Command::Audio,
            _ => return None,
        })
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Command::Reset => "reset",
            Command::Ping => "ping",
            Command::ZeroClock => "zero-clock",
            Command::SyncSend => "sync-send",
            Command::SyncReadout => "sync-readout",
            Command::TimeNow => "time-now",
            Command::AutoLaserOn => "auto-laser-on",
            Command::AutoLaserOff => "auto-laser-off",
            Command::AutoScreenOn => "auto-screen-on",
            Command::AutoScreenOff => "auto-screen-off",
            Command::ShockRead => "shock-read",
            Command::Version => "version",
            Command::SampleAll => "sample-all",
            Command::BrightnessCurve => "brightness-curve",
            Command::Audio => "audio",
        };
        write!(f, "{name} ({})", self.opcode() as char)
    }
}
