//! Shared client state
//!
//! One [`ClientContext`] per client, behind `Arc<parking_lot::Mutex>`.
//! The worker task owns the hot path (inbound frames, retry ticks);
//! the public handle takes the same lock briefly for connect, send and
//! terminate. Nothing here performs I/O: state transitions that need a
//! packet on the wire hand a fully built [`Outbound`] frame back to
//! the caller, which transmits after releasing the lock.

use std::sync::Arc;

use bytes::Bytes;
use rppoe_core::config::{
    MAX_AC_COOKIE_SIZE, MAX_AC_NAME_SIZE, MAX_RELAY_SESSION_ID_SIZE,
};
use rppoe_core::{ClientConfig, FramePool, SendKind};
use rppoe_packet::MacAddr;
use tokio::sync::{mpsc, oneshot};

use crate::retry::RetryTimer;

/// Discovery progress for the single session this client drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DiscoveryState {
    /// No discovery attempt in flight
    Initial,
    /// PADI broadcast, waiting for a PADO offer
    PadiSent,
    /// PADR sent to the selected concentrator, waiting for PADS
    PadrSent,
    /// Session confirmed; session data may flow
    Established,
}

/// Peer identity, valid from PADO (MAC) and PADS (session id) onward.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PeerSession {
    pub mac: MacAddr,
    pub session_id: u16,
}

/// Error-tag flags accumulated while walking one packet's tags. Any
/// set bit disqualifies the packet from advancing discovery.
pub(crate) const ERROR_SERVICE_NAME: u8 = 0x01;
pub(crate) const ERROR_AC_SYSTEM: u8 = 0x02;
pub(crate) const ERROR_GENERIC: u8 = 0x04;

/// Peer-supplied tags cached from the most recent offer, echoed back
/// in PADR (cookie, relay id) and PADT (relay id).
#[derive(Debug, Default)]
pub(crate) struct TagCaches {
    pub ac_name: Vec<u8>,
    pub ac_cookie: Vec<u8>,
    pub relay_session_id: Vec<u8>,
}

impl TagCaches {
    pub(crate) fn clear(&mut self) {
        self.ac_name.clear();
        self.ac_cookie.clear();
        self.relay_session_id.clear();
    }

    /// Per-tag cache bounds. An oversized tag is grounds to drop the
    /// whole packet, never to truncate the value.
    pub(crate) fn limit_for(tag: CachedTag) -> usize {
        match tag {
            CachedTag::AcName => MAX_AC_NAME_SIZE,
            CachedTag::AcCookie => MAX_AC_COOKIE_SIZE,
            CachedTag::RelaySessionId => MAX_RELAY_SESSION_ID_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum CachedTag {
    AcName,
    AcCookie,
    RelaySessionId,
}

/// How a waited-on connect attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectOutcome {
    Established,
    /// Discovery retries ran out without an answer
    Exhausted,
}

/// An outbound frame built under the context lock, transmitted after
/// the lock is released.
#[derive(Debug)]
pub(crate) struct Outbound {
    pub frame: Bytes,
    pub dst: MacAddr,
    pub kind: SendKind,
}

pub(crate) struct ClientContext {
    pub config: ClientConfig,
    pub local_mac: MacAddr,
    /// Requested service; empty means "any service" and matches a
    /// zero-length Service-Name in offers
    pub service_name: Bytes,
    /// Optional Host-Uniq; when set, offers must echo it exactly
    pub host_uniq: Option<Bytes>,
    pub state: DiscoveryState,
    pub session: PeerSession,
    pub retry: RetryTimer,
    pub caches: TagCaches,
    pub error_flags: u8,
    /// At most one caller waits on connect completion
    pub waiter: Option<oneshot::Sender<ConnectOutcome>>,
    pub pool: Arc<dyn FramePool>,
    /// Upper-layer consumer of inbound session payloads
    pub session_tx: mpsc::Sender<Bytes>,
}

impl ClientContext {
    pub(crate) fn new(
        config: ClientConfig,
        local_mac: MacAddr,
        pool: Arc<dyn FramePool>,
        session_tx: mpsc::Sender<Bytes>,
    ) -> Self {
        Self {
            config,
            local_mac,
            service_name: Bytes::new(),
            host_uniq: None,
            state: DiscoveryState::Initial,
            session: PeerSession::default(),
            retry: RetryTimer::new(),
            caches: TagCaches::default(),
            error_flags: 0,
            waiter: None,
            pool,
            session_tx,
        }
    }

    /// Tear the discovery attempt / session down to `Initial`. Does
    /// not touch the waiter; call sites decide how to resolve it.
    pub(crate) fn reset(&mut self) {
        self.state = DiscoveryState::Initial;
        self.session = PeerSession::default();
        self.retry.disarm();
        self.caches.clear();
        self.error_flags = 0;
    }

    /// Resolve the waiting connect caller, if any.
    pub(crate) fn resolve_waiter(&mut self, outcome: ConnectOutcome) {
        if let Some(tx) = self.waiter.take() {
            // The caller may have stopped waiting; that is fine.
            let _ = tx.send(outcome);
        }
    }

    /// Cleanup requested by a connect caller whose wait was cancelled
    /// (timeout or future drop). Abandons an in-flight discovery
    /// attempt but never an established session.
    pub(crate) fn abandon_connect(&mut self) {
        self.waiter = None;
        if matches!(
            self.state,
            DiscoveryState::PadiSent | DiscoveryState::PadrSent
        ) {
            self.reset();
        }
    }
}
