//! Public client handle
//!
//! [`PppoeClient`] owns the worker task and the channels into it. The
//! handle is cheap to share behind an `Arc`; every method takes
//! `&self`. Dropping the last handle closes the worker's channels and
//! the worker exits on its own; [`PppoeClient::shutdown`] does the
//! same but waits for it.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use rppoe_core::config::{MAX_HOST_UNIQ_SIZE, MAX_SERVICE_NAME_SIZE};
use rppoe_core::{ClientConfig, Error, FramePool, LinkSender, Result};
use rppoe_packet::MacAddr;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

use crate::context::{ClientContext, ConnectOutcome, DiscoveryState};
use crate::worker::{self, Command, FrameInjector};

/// How long `connect` blocks the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectMode {
    /// Kick discovery off and return immediately; the retry
    /// supervisor runs it to completion or exhaustion in the
    /// background
    NoWait,
    /// Block until the session is established or retries are
    /// exhausted
    Wait,
    /// Like `Wait`, but give up (and abandon the attempt) after the
    /// given duration
    Timeout(Duration),
}

/// Handle to one PPPoE client instance.
///
/// A client drives exactly one session over one interface. Inbound
/// frames are delivered through the [`FrameInjector`] obtained from
/// [`PppoeClient::frame_injector`]; received session payloads come out
/// of the receiver returned by [`PppoeClient::create`].
pub struct PppoeClient {
    ctx: Arc<Mutex<ClientContext>>,
    sender: Arc<dyn LinkSender>,
    frame_tx: mpsc::Sender<rppoe_core::RawFrame>,
    command_tx: mpsc::Sender<Command>,
    worker: JoinHandle<()>,
}

impl PppoeClient {
    /// Create a client and spawn its worker task. Must be called from
    /// within a tokio runtime.
    ///
    /// Returns the handle plus the receiver on which inbound session
    /// payloads (PPP frames, padding already stripped) are delivered.
    pub fn create(
        local_mac: MacAddr,
        config: ClientConfig,
        sender: Arc<dyn LinkSender>,
        pool: Arc<dyn FramePool>,
    ) -> (Self, mpsc::Receiver<Bytes>) {
        let (session_tx, session_rx) = mpsc::channel(config.session_queue_depth);
        let (frame_tx, frame_rx) = mpsc::channel(config.inbound_queue_depth);
        let (command_tx, command_rx) = mpsc::channel(4);

        let tick_period = config.tick_period;
        let ctx = Arc::new(Mutex::new(ClientContext::new(
            config, local_mac, pool, session_tx,
        )));

        let worker = tokio::spawn(worker::run(
            ctx.clone(),
            sender.clone(),
            frame_rx,
            command_rx,
            tick_period,
        ));

        info!(mac = %local_mac, "pppoe client created");

        (
            Self {
                ctx,
                sender,
                frame_tx,
                command_tx,
                worker,
            },
            session_rx,
        )
    }

    /// Producer handle for the inbound frame queue; clone it into the
    /// capture loop feeding this client.
    pub fn frame_injector(&self) -> FrameInjector {
        FrameInjector::new(self.frame_tx.clone())
    }

    /// Set the Service-Name requested in PADI/PADR. An empty name
    /// requests any service. Only allowed while no discovery attempt
    /// or session is active.
    pub fn set_service_name(&self, name: &[u8]) -> Result<()> {
        if name.len() > MAX_SERVICE_NAME_SIZE {
            return Err(Error::invalid_parameter("service_name", "longer than 255 bytes"));
        }
        let mut ctx = self.ctx.lock();
        if ctx.state != DiscoveryState::Initial {
            return Err(Error::InvalidSessionState);
        }
        ctx.service_name = Bytes::copy_from_slice(name);
        Ok(())
    }

    /// Set (or with `None` clear) the Host-Uniq carried in PADI/PADR.
    /// When set, offers must echo it exactly to be accepted.
    pub fn set_host_uniq(&self, value: Option<&[u8]>) -> Result<()> {
        if let Some(v) = value {
            if v.len() > MAX_HOST_UNIQ_SIZE {
                return Err(Error::invalid_parameter("host_uniq", "longer than 255 bytes"));
            }
        }
        let mut ctx = self.ctx.lock();
        if ctx.state != DiscoveryState::Initial {
            return Err(Error::InvalidSessionState);
        }
        ctx.host_uniq = value.map(Bytes::copy_from_slice);
        Ok(())
    }

    /// Start discovery and, depending on `mode`, wait for the
    /// outcome.
    ///
    /// Errors with [`Error::InvalidSessionState`] unless the client is
    /// idle. `NoWait` returns `Ok` once the attempt is underway; the
    /// other modes return `Ok` on an established session,
    /// [`Error::ConnectFailed`] when retries were exhausted, and
    /// [`Error::ConnectTimeout`] when the caller's own limit fired
    /// first (the in-flight attempt is abandoned).
    pub async fn connect(&self, mode: ConnectMode) -> Result<()> {
        let (outbound, wait_rx) = {
            let mut ctx = self.ctx.lock();
            if ctx.state != DiscoveryState::Initial {
                return Err(Error::InvalidSessionState);
            }

            let outbound = ctx.start_connect();
            let wait_rx = if matches!(mode, ConnectMode::NoWait) {
                None
            } else {
                let (tx, rx) = oneshot::channel();
                ctx.waiter = Some(tx);
                Some(rx)
            };
            (outbound, wait_rx)
        };

        if let Some(out) = outbound {
            if let Err(e) = self.sender.send_frame(out.frame, out.dst, out.kind).await {
                // The retry supervisor resends; a failed first PADI is
                // not fatal.
                warn!(error = %e, "initial PADI send failed");
            }
        }

        let Some(rx) = wait_rx else {
            return Ok(());
        };

        let outcome = if let ConnectMode::Timeout(limit) = mode {
            match time::timeout(limit, rx).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    debug!(?limit, "connect wait timed out, abandoning attempt");
                    let _ = self.command_tx.send(Command::AbandonConnect).await;
                    return Err(Error::ConnectTimeout);
                }
            }
        } else {
            rx.await
        };

        match outcome.map_err(|_| Error::Closed)? {
            ConnectOutcome::Established => Ok(()),
            ConnectOutcome::Exhausted => Err(Error::ConnectFailed),
        }
    }

    /// Send one PPP frame over the established session. The payload
    /// must start with the 2-byte PPP protocol field.
    pub async fn send_session(&self, payload: &[u8]) -> Result<()> {
        if payload.len() < 2 {
            return Err(Error::invalid_parameter(
                "payload",
                "shorter than the PPP protocol field",
            ));
        }

        let out = {
            let ctx = self.ctx.lock();
            if ctx.state != DiscoveryState::Established {
                return Err(Error::SessionNotEstablished);
            }
            ctx.build_session(payload)?
        };

        self.sender.send_frame(out.frame, out.dst, out.kind).await
    }

    /// Terminate the established session: send PADT to the peer and
    /// drop back to the idle state.
    ///
    /// Local state is reset as soon as the PADT is built; a failure to
    /// transmit it is logged but the session is gone either way.
    pub async fn terminate(&self) -> Result<()> {
        let out = {
            let mut ctx = self.ctx.lock();
            if ctx.state != DiscoveryState::Established {
                return Err(Error::SessionNotEstablished);
            }
            // A build failure leaves the session intact for a retry.
            let out = ctx.build_padt()?;
            info!(session_id = ctx.session.session_id, peer = %ctx.session.mac,
                  "terminating session");
            ctx.reset();
            out
        };

        if let Err(e) = self.sender.send_frame(out.frame, out.dst, out.kind).await {
            warn!(error = %e, "PADT send failed; session torn down locally");
        }
        Ok(())
    }

    /// Peer MAC and session id of the established session, if any.
    pub fn session_info(&self) -> Option<(MacAddr, u16)> {
        let ctx = self.ctx.lock();
        if ctx.state == DiscoveryState::Established {
            Some((ctx.session.mac, ctx.session.session_id))
        } else {
            None
        }
    }

    /// Stop the worker task and wait for it to finish. Pending
    /// connect waiters observe [`Error::Closed`].
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(Command::Shutdown).await;
        if let Err(e) = self.worker.await {
            debug!(error = %e, "worker join failed");
        }
    }
}
