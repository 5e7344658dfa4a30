//! Ethernet and PPPoE (RFC2516) wire codec
//!
//! Pure transforms over caller-owned buffers: Ethernet II framing,
//! the 6-byte PPPoE header and TLV discovery tags. No I/O and no
//! protocol state lives here.

pub mod buf;
pub mod ethernet;
pub mod pppoe;

pub use buf::FrameBuf;
pub use ethernet::{EtherType, EthernetHeader, MacAddr};
pub use pppoe::{append_tag, PppoeCode, PppoeHeader, Tag, TagIter, TagType};

use thiserror::Error;

/// Codec-level failures. Anything wire-malformed maps to
/// [`CodecError::Malformed`] and the caller is expected to drop the
/// whole packet; [`CodecError::PayloadTooLarge`] aborts an outbound
/// build when a tag would not fit the transmit buffer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// A tag's declared length runs past the end of the payload.
    #[error("malformed packet: tag overruns payload")]
    Malformed,

    /// Appending would exceed the buffer's fixed capacity.
    #[error("payload too large: need {needed} bytes, {remaining} remaining")]
    PayloadTooLarge { needed: usize, remaining: usize },
}
