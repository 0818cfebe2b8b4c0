//! TCP bridge server.
//!
//! Lets a remote client drive the probe through this host: client bytes
//! are forwarded verbatim to the serial link, probe lines are forwarded
//! back, and the special `bridge` / `bridge sync` commands run a clock
//! sync exchange on the client's behalf, replying with the established
//! reference and lag window.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::forward::{
    ClientSender, ClientSlot, ForwardHandle, spawn_forward_loop, wait_for_shutdown,
};
use crate::clock::ClockSync;
use crate::error::{BridgeError, SyncError};
use crate::types::{BridgeConfig, SyncConfig};

/// TCP bridge between a network client and the probe.
///
/// Accepts one client at a time; a new connection is served only after
/// the previous one disconnects.
pub struct BridgeServer {
    sync: ClockSync,
    sync_config: SyncConfig,
    listener: TcpListener,
}

impl BridgeServer {
    /// Bind the listening socket.
    ///
    /// # Errors
    /// [`BridgeError::Bind`] when the address cannot be bound.
    pub async fn bind(sync: ClockSync, config: &BridgeConfig) -> Result<Self, BridgeError> {
        let listener = TcpListener::bind(config.bind_addr())
            .await
            .map_err(BridgeError::Bind)?;
        if let Ok(addr) = listener.local_addr() {
            info!(%addr, "bridge listening");
        }
        Ok(Self {
            sync,
            sync_config: SyncConfig::default(),
            listener,
        })
    }

    /// Override the zero-clock policy used by `bridge sync`.
    #[must_use]
    pub fn with_sync_config(mut self, config: SyncConfig) -> Self {
        self.sync_config = config;
        self
    }

    /// The bound listener address.
    ///
    /// # Errors
    /// Propagates the socket error.
    pub fn local_addr(&self) -> Result<SocketAddr, BridgeError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the shutdown flag flips.
    ///
    /// Spawns the forward loop, then accepts and serves one client after
    /// another. The socket and the forward loop are released on every
    /// exit path; in-flight forwarding is simply abandoned.
    ///
    /// # Errors
    /// [`BridgeError`] on accept failures; per-client I/O errors only end
    /// that client's session.
    pub async fn run(mut self, shutdown: watch::Receiver<bool>) -> Result<(), BridgeError> {
        let slot: ClientSlot = Arc::new(tokio::sync::Mutex::new(None));
        let handle = spawn_forward_loop(
            Arc::clone(self.sync.link()),
            Arc::clone(&slot),
            shutdown.clone(),
        );

        let mut accept_shutdown = shutdown.clone();
        loop {
            let (stream, addr) = tokio::select! {
                result = self.listener.accept() => result?,
                () = wait_for_shutdown(&mut accept_shutdown) => break,
            };
            info!(%addr, "bridge client connected");

            let (read_half, write_half) = stream.into_split();
            let (client_tx, client_rx) = mpsc::channel::<String>(64);
            *slot.lock().await = Some(client_tx.clone());
            let writer = tokio::spawn(client_write_loop(write_half, client_rx));

            let result = self
                .serve_client(read_half, &client_tx, &handle, shutdown.clone())
                .await;
            *slot.lock().await = None;
            drop(client_tx);
            let _ = writer.await;

            match result {
                Ok(()) => info!(%addr, "bridge client disconnected"),
                Err(e) => warn!(%addr, error = %e, "bridge client session ended"),
            }
        }
        Ok(())
    }

    /// Serve one connected client until it disconnects.
    async fn serve_client(
        &mut self,
        mut read_half: OwnedReadHalf,
        client: &ClientSender,
        handle: &ForwardHandle,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), BridgeError> {
        let mut buf = BytesMut::with_capacity(1024);
        loop {
            buf.clear();
            let n = tokio::select! {
                result = read_half.read_buf(&mut buf) => result?,
                () = wait_for_shutdown(&mut shutdown) => return Ok(()),
            };
            if n == 0 {
                return Ok(());
            }
            self.handle_payload(&buf[..n], client, handle).await?;
        }
    }

    /// Dispatch one client payload: a `bridge` command runs the sync
    /// handshake, anything else goes to the probe verbatim.
    async fn handle_payload(
        &mut self,
        payload: &[u8],
        client: &ClientSender,
        handle: &ForwardHandle,
    ) -> Result<(), BridgeError> {
        if payload.is_empty() {
            return Ok(());
        }
        let text = String::from_utf8_lossy(payload);
        if text.trim_start().starts_with("bridge") {
            let with_sync = text.contains("sync");
            debug!(command = %text.trim(), "bridge command, pausing forwarder");

            handle.pause(self.sync.link()).await?;
            let outcome = self.run_clock_exchange(with_sync).await;
            // The forwarder always comes back, even when sync failed; one
            // bad exchange must not wedge the stream.
            handle.resume().await?;

            let reply = outcome?;
            debug!(reply = reply.trim(), "bridge clock reply");
            if client.send(reply).await.is_err() {
                return Err(BridgeError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "client gone before clock reply",
                )));
            }
            return Ok(());
        }

        self.sync.link().write_bytes(payload).await?;
        Ok(())
    }

    /// Run the clock exchange for a `bridge` command while the forwarder
    /// is parked, and format the reply line.
    async fn run_clock_exchange(&mut self, with_sync: bool) -> Result<String, BridgeError> {
        if with_sync {
            self.sync.zero_clock(&self.sync_config).await?;
        }
        self.sync.estimate_lag().await?;
        let state = self
            .sync
            .state_mut()
            .ok_or(BridgeError::Sync(SyncError::NotZeroed))?;
        if with_sync {
            // The client treats the base as the exact remote zero, so
            // re-anchor the window at its lower bound.
            state.normalize();
        }
        Ok(format!(
            "clock {} {} {}\n",
            state.base_wall_micros(),
            state.min_lag_micros(),
            state.max_lag_micros()
        ))
    }
}

/// Drain the client channel into the socket. Forwarded probe lines and
/// clock replies share this path, which keeps their ordering.
async fn client_write_loop(mut write_half: OwnedWriteHalf, mut rx: mpsc::Receiver<String>) {
    while let Some(line) = rx.recv().await {
        if write_half.write_all(line.as_bytes()).await.is_err() {
            break;
        }
    }
    let _ = write_half.shutdown().await;
}
