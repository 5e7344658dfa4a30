//! Collaborator traits at the link boundary
//!
//! The client never touches hardware directly: outbound frames go
//! through a [`LinkSender`], transmit buffers come from a
//! [`FramePool`], and inbound frames arrive as [`RawFrame`]s pushed
//! into the client's queue by whatever drives the receive side.

use async_trait::async_trait;
use bytes::Bytes;
use rppoe_packet::{FrameBuf, MacAddr};

use crate::Result;

/// Distinguishes discovery-stage from session-stage sends, so link
/// drivers that treat the two differently (separate queues, priority)
/// can tell them apart without re-parsing the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendKind {
    Discovery,
    Session,
}

/// Outbound side of the Ethernet link.
///
/// `frame` is fully framed (Ethernet header included); `dst` repeats
/// the destination for drivers that address by descriptor rather than
/// by frame bytes.
#[async_trait]
pub trait LinkSender: Send + Sync {
    async fn send_frame(&self, frame: Bytes, dst: MacAddr, kind: SendKind) -> Result<()>;
}

/// Supplies fixed-capacity transmit buffers.
///
/// Returns `None` on exhaustion; the caller surfaces that as a
/// synchronous failure and the retry supervisor tries again at the
/// next tick.
pub trait FramePool: Send + Sync {
    fn allocate(&self) -> Option<FrameBuf>;
}

/// Unbounded heap-backed pool handing out buffers of one fixed
/// per-frame capacity.
#[derive(Debug, Clone)]
pub struct HeapFramePool {
    frame_capacity: usize,
}

impl HeapFramePool {
    pub fn new(frame_capacity: usize) -> Self {
        Self { frame_capacity }
    }
}

impl FramePool for HeapFramePool {
    fn allocate(&self) -> Option<FrameBuf> {
        Some(FrameBuf::new(self.frame_capacity))
    }
}

/// A raw inbound frame, Ethernet header intact.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Frame bytes starting at the destination MAC
    pub data: Bytes,
    /// Set when the capture could not deliver the frame in one
    /// contiguous buffer; such frames are discarded unprocessed.
    pub truncated: bool,
}

impl RawFrame {
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            truncated: false,
        }
    }
}
