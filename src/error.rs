use std::io;
use thiserror::Error;

/// Errors from the serial device link.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The serial channel could not be opened. Fatal: nothing can proceed
    /// without the probe.
    #[error("cannot open serial device {device}: {source}")]
    Open {
        /// Path of the serial device that failed to open.
        device: String,
        /// The underlying serial layer error.
        #[source]
        source: tokio_serial::Error,
    },

    /// I/O failure on an already-open channel.
    #[error("serial I/O error: {0}")]
    Io(#[from] io::Error),

    /// The channel was closed while a read was in flight.
    #[error("serial channel closed")]
    Closed,
}

/// Errors from the clock synchronization protocols.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The calibration burst measured a median round trip above the limit.
    /// The link cannot support timing-sensitive protocols.
    #[error("median round trip {median_ms:.2} ms exceeds the {limit_ms:.0} ms limit")]
    SlowLink {
        /// Observed median round trip in milliseconds.
        median_ms: f64,
        /// The acceptance limit in milliseconds.
        limit_ms: f64,
    },

    /// Every zero-clock attempt exceeded the round-trip deadline.
    #[error("failed to zero the clock after {retries} retries")]
    ZeroFailed {
        /// Number of attempts made.
        retries: u32,
    },

    /// `estimate_lag` was called before a successful zero.
    #[error("clock has not been zeroed")]
    NotZeroed,

    /// A sync-readout reply did not parse as `<index>:<timestamp_us>`.
    #[error("malformed sync readout line: {line:?}")]
    MalformedReadout {
        /// The offending reply line.
        line: String,
    },

    /// Underlying link failure during a sync exchange.
    #[error("link error during sync: {0}")]
    Link(#[from] LinkError),
}

/// A trigger line from the probe failed to parse.
///
/// Returned as a value so the caller decides whether to skip the event or
/// abort the run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TriggerParseError {
    /// The line did not split into exactly five fields.
    #[error("trigger line has {got} fields, expected 5: {line:?}")]
    FieldCount {
        /// Number of whitespace-separated fields found.
        got: usize,
        /// The offending line.
        line: String,
    },

    /// The leading tag was not the trigger marker.
    #[error("unexpected trigger tag {tag:?}")]
    BadTag {
        /// The tag field found.
        tag: String,
    },

    /// The kind field named no known sensor.
    #[error("unknown trigger kind {kind:?}")]
    UnknownKind {
        /// The kind field found.
        kind: String,
    },

    /// The timestamp field was not an integer microsecond count.
    #[error("bad trigger timestamp {field:?}")]
    BadTimestamp {
        /// The timestamp field found.
        field: String,
    },

    /// The value field was not 0 or 1.
    #[error("bad trigger value {field:?}")]
    BadValue {
        /// The value field found.
        field: String,
    },

    /// The repeat-count field was not an integer.
    #[error("bad trigger repeat count {field:?}")]
    BadRepeat {
        /// The repeat field found.
        field: String,
    },
}

/// Errors from the pure latency estimators.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EstimatorError {
    /// Too few events to fit a line for one of the beam sides.
    #[error("{side_events} crossing events on one side, need at least {needed}")]
    InsufficientData {
        /// Events available on the sparser side.
        side_events: usize,
        /// Minimum events required per side.
        needed: usize,
    },

    /// An input sequence that must be non-empty was empty.
    #[error("empty input sequence: {name}")]
    EmptyInput {
        /// Which input was empty.
        name: &'static str,
    },
}

/// Errors from the TCP bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Could not bind the listening socket.
    #[error("cannot bind bridge listener: {0}")]
    Bind(#[source] io::Error),

    /// Socket I/O failure with the connected client.
    #[error("bridge socket error: {0}")]
    Io(#[from] io::Error),

    /// The forward loop terminated and can no longer be controlled.
    #[error("forward loop is gone")]
    ForwardLoopGone,

    /// Clock sync failed while serving a bridge command.
    #[error("bridge clock sync failed: {0}")]
    Sync(#[from] SyncError),

    /// Underlying link failure while forwarding.
    #[error("link error in bridge: {0}")]
    Link(#[from] LinkError),
}

/// Umbrella error for probe operations.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Device link error.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Clock synchronization error.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Trigger line parse error.
    #[error(transparent)]
    Trigger(#[from] TriggerParseError),

    /// Latency estimator error.
    #[error(transparent)]
    Estimator(#[from] EstimatorError),

    /// TCP bridge error.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// A probe reply had an unexpected shape for the command sent.
    #[error("unexpected reply to {command}: {reply:?}")]
    UnexpectedReply {
        /// The command that was sent.
        command: crate::link::Command,
        /// The reply line received.
        reply: String,
    },
}
