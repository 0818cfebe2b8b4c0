//! Serial-to-network forward loop.
//!
//! A long-lived task that blocks on the serial link and pushes every line
//! to the connected client. The link allows only one logical reader at a
//! time, so while a bridge command runs its own sync exchanges the loop
//! must be parked: the handler requests a pause, breaks the loop's
//! in-flight blocking read with a ping, and waits for the acknowledgment
//! before touching the link. The ping's reply is discarded here, never
//! forwarded.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, trace};

use crate::error::BridgeError;
use crate::link::{Command, ProbeLink};

/// Control messages for the forward loop.
pub(crate) enum ForwardControl {
    /// Stop reading the link; acknowledge once no read is in flight.
    Pause(oneshot::Sender<()>),
    /// Start reading again.
    Resume,
}

/// Sender half of the per-connection client channel.
pub(crate) type ClientSender = mpsc::Sender<String>;

/// Slot holding the currently connected client, if any.
pub(crate) type ClientSlot = Arc<tokio::sync::Mutex<Option<ClientSender>>>;

/// Handle for pausing and resuming the forward loop.
pub(crate) struct ForwardHandle {
    ctrl: mpsc::Sender<ForwardControl>,
}

impl ForwardHandle {
    /// Park the forward loop and wait until it confirms it no longer
    /// reads the link.
    ///
    /// The loop usually sits inside a blocking `read_line`; a ping makes
    /// the probe produce a line so that read completes. The loop discards
    /// that line once it sees the pause request.
    pub(crate) async fn pause(&self, link: &Arc<dyn ProbeLink>) -> Result<(), BridgeError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.ctrl
            .send(ForwardControl::Pause(ack_tx))
            .await
            .map_err(|_| BridgeError::ForwardLoopGone)?;
        link.write_bytes(&[Command::Ping.opcode()]).await?;
        ack_rx.await.map_err(|_| BridgeError::ForwardLoopGone)?;
        Ok(())
    }

    /// Let the forward loop read the link again.
    pub(crate) async fn resume(&self) -> Result<(), BridgeError> {
        self.ctrl
            .send(ForwardControl::Resume)
            .await
            .map_err(|_| BridgeError::ForwardLoopGone)
    }
}

/// Spawn the forward loop over `link`, delivering lines to whatever client
/// currently occupies `slot`.
pub(crate) fn spawn_forward_loop(
    link: Arc<dyn ProbeLink>,
    slot: ClientSlot,
    shutdown: watch::Receiver<bool>,
) -> ForwardHandle {
    let (ctrl_tx, ctrl_rx) = mpsc::channel(4);
    tokio::spawn(forward_loop(link, slot, ctrl_rx, shutdown));
    ForwardHandle { ctrl: ctrl_tx }
}

async fn forward_loop(
    link: Arc<dyn ProbeLink>,
    slot: ClientSlot,
    mut ctrl: mpsc::Receiver<ForwardControl>,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!("forward loop running");
    loop {
        // A pause requested between reads is honored before touching the
        // link again.
        match ctrl.try_recv() {
            Ok(ForwardControl::Pause(ack)) => {
                if !stay_paused(ack, &mut ctrl).await {
                    return;
                }
                continue;
            }
            Ok(ForwardControl::Resume) | Err(mpsc::error::TryRecvError::Empty) => {}
            Err(mpsc::error::TryRecvError::Disconnected) => return,
        }

        let line = tokio::select! {
            result = link.read_line() => match result {
                Ok(line) => line,
                Err(e) => {
                    error!(error = %e, "forward loop read failed");
                    return;
                }
            },
            () = wait_for_shutdown(&mut shutdown) => {
                debug!("forward loop shutting down");
                return;
            }
        };

        // A pause requested while the read was parked means this line is
        // the handshake ping's reply: drop it instead of forwarding.
        if let Ok(ForwardControl::Pause(ack)) = ctrl.try_recv() {
            trace!(discarded = line.as_str(), "pause during read");
            if !stay_paused(ack, &mut ctrl).await {
                return;
            }
            continue;
        }

        if line.is_empty() {
            // Read timeout: no event.
            continue;
        }
        if let Some(client) = slot.lock().await.clone() {
            trace!(line = line.as_str(), "serial -> net");
            if client.send(format!("{line}\n")).await.is_err() {
                // Client went away mid-send; the accept loop will clear
                // the slot.
                trace!("client channel closed, line dropped");
            }
        }
    }
}

/// Acknowledge a pause and block until resumed. Returns `false` when the
/// control channel is gone and the loop should exit.
async fn stay_paused(
    ack: oneshot::Sender<()>,
    ctrl: &mut mpsc::Receiver<ForwardControl>,
) -> bool {
    debug!("forward loop paused");
    let _ = ack.send(());
    loop {
        match ctrl.recv().await {
            Some(ForwardControl::Resume) => {
                debug!("forward loop resumed");
                return true;
            }
            // Already paused; acknowledge immediately.
            Some(ForwardControl::Pause(ack)) => {
                let _ = ack.send(());
            }
            None => return false,
        }
    }
}

/// Resolve when the shutdown flag flips to `true` or the sender is gone.
pub(crate) async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
