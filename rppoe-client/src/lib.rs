//! PPPoE client (RFC2516)
//!
//! Establishes a point-to-point tunnel over a raw Ethernet transport:
//! runs the PPPoE Discovery handshake (PADI → PADO → PADR → PADS,
//! PADT teardown) and relays encapsulated session payloads between the
//! link and an upper-layer PPP engine.
//!
//! One client instance drives exactly one session. All protocol state
//! is mutated by a single worker task; callers interact through the
//! [`PppoeClient`] handle and deliver inbound frames through a
//! [`FrameInjector`].

mod context;
mod discovery;
mod retry;
mod worker;

pub mod client;

pub use client::{ConnectMode, PppoeClient};
pub use worker::FrameInjector;

// Re-export the types a caller needs to wire a client up.
pub use rppoe_core::{
    ClientConfig, Error, FramePool, HeapFramePool, Interface, LinkSender, RawFrame, Result,
    RetryParams, SendKind,
};
pub use rppoe_packet::MacAddr;
