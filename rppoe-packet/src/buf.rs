//! Fixed-capacity transmit buffer

use bytes::{Bytes, BytesMut};

use crate::CodecError;

/// A transmit buffer with a hard capacity limit.
///
/// Backed by `BytesMut` but, unlike it, refuses to grow: every append
/// is checked against the capacity the buffer was created with, so an
/// oversized discovery payload surfaces as
/// [`CodecError::PayloadTooLarge`] instead of a reallocation.
#[derive(Debug)]
pub struct FrameBuf {
    buf: BytesMut,
    capacity: usize,
}

impl FrameBuf {
    /// Create an empty buffer with the given fixed capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Total capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes still available.
    pub fn remaining(&self) -> usize {
        self.capacity - self.buf.len()
    }

    /// Append raw bytes, checking the capacity first.
    pub fn put_slice(&mut self, data: &[u8]) -> Result<(), CodecError> {
        if data.len() > self.remaining() {
            return Err(CodecError::PayloadTooLarge {
                needed: data.len(),
                remaining: self.remaining(),
            });
        }
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Append `count` zero bytes, checking the capacity first.
    ///
    /// Used to reserve header space that is filled in after the
    /// payload is known.
    pub fn put_zeros(&mut self, count: usize) -> Result<(), CodecError> {
        if count > self.remaining() {
            return Err(CodecError::PayloadTooLarge {
                needed: count,
                remaining: self.remaining(),
            });
        }
        self.buf.resize(self.buf.len() + count, 0);
        Ok(())
    }

    /// Pad with zero bytes up to `len` (no-op when already longer).
    pub fn pad_to(&mut self, len: usize) -> Result<(), CodecError> {
        if self.buf.len() >= len {
            return Ok(());
        }
        let missing = len - self.buf.len();
        self.put_zeros(missing)
    }

    /// Mutable view of the written bytes, for header fix-ups.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// View of the written bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Freeze into an immutable frame.
    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}
