//! Shared infrastructure for the rppoe PPPoE client
//!
//! This crate provides the error taxonomy, the collaborator traits the
//! client is wired with (link sender, transmit-buffer pool), client
//! configuration, and a `pnet_datalink`-backed network interface.

pub mod config;
pub mod error;
pub mod interface;
pub mod link;

pub use config::{ClientConfig, RetryParams};
pub use error::{Error, Result};
pub use interface::Interface;
pub use link::{FramePool, HeapFramePool, LinkSender, RawFrame, SendKind};
