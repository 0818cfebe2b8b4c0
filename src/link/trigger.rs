//! Trigger line parsing.
//!
//! While auto-triggering is enabled the probe pushes one line per sensor
//! transition, e.g. `G L 12902345 1 1`:
//!
//! - `G` — common tag for all trigger lines
//! - `L` — sensor kind (laser here)
//! - `12902345` — microseconds since the clock was zeroed
//! - `1` — new sensor value: 0 changed to dark, 1 changed to light
//! - `1` — how many times this trigger fired since the last readout

use crate::error::TriggerParseError;

/// The sensor a trigger line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// Laser gate crossing.
    Laser,
    /// Screen photodiode transition.
    Screen,
    /// Shock (accelerometer) event.
    Shock,
    /// Audio beep playback.
    Audio,
}

impl TriggerKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "L" => Some(TriggerKind::Laser),
            "S" => Some(TriggerKind::Screen),
            "G" => Some(TriggerKind::Shock),
            "A" => Some(TriggerKind::Audio),
            _ => None,
        }
    }
}

/// A timestamped physical sensor transition reported by the probe.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerEvent {
    /// Seconds since the probe clock was zeroed (remote clock).
    pub timestamp: f64,
    /// Which sensor fired.
    pub kind: TriggerKind,
    /// New sensor value: 0 = dark/low, 1 = light/high.
    pub value: u8,
    /// Trigger count since the last readout. 1 in normal operation.
    pub repeat: u32,
}

impl TriggerEvent {
    /// Parse one trigger line.
    ///
    /// Exactly five whitespace-separated fields are required; anything else
    /// is a hard parse failure. The caller decides whether to skip the
    /// event or abort the run.
    ///
    /// # Errors
    /// Returns a [`TriggerParseError`] describing the first offending field.
    #[allow(clippy::cast_precision_loss)]
    pub fn parse(line: &str) -> Result<Self, TriggerParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(TriggerParseError::FieldCount {
                got: parts.len(),
                line: line.to_string(),
            });
        }
        if parts[0] != "G" {
            return Err(TriggerParseError::BadTag {
                tag: parts[0].to_string(),
            });
        }
        let kind = TriggerKind::from_tag(parts[1]).ok_or_else(|| TriggerParseError::UnknownKind {
            kind: parts[1].to_string(),
        })?;
        let t_us: u64 = parts[2]
            .parse()
            .map_err(|_| TriggerParseError::BadTimestamp {
                field: parts[2].to_string(),
            })?;
        let value: u8 = match parts[3] {
            "0" => 0,
            "1" => 1,
            other => {
                return Err(TriggerParseError::BadValue {
                    field: other.to_string(),
                });
            }
        };
        let repeat: u32 = parts[4].parse().map_err(|_| TriggerParseError::BadRepeat {
            field: parts[4].to_string(),
        })?;

        Ok(Self {
            timestamp: t_us as f64 * 1e-6,
            kind,
            value,
            repeat,
        })
    }
}
