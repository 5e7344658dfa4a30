//! PPPoE header and discovery tag (TLV) codec — RFC2516

use crate::{CodecError, FrameBuf};

/// Fixed version/type byte: version 1 in the high nibble, type 1 in
/// the low nibble. Packets carrying anything else are dropped.
pub const VER_TYPE: u8 = 0x11;

/// PPPoE Discovery/Session codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PppoeCode {
    /// PADI - Active Discovery Initiation (client broadcast)
    Padi = 0x09,
    /// PADO - Active Discovery Offer (server unicast)
    Pado = 0x07,
    /// PADR - Active Discovery Request (client unicast)
    Padr = 0x19,
    /// PADS - Active Discovery Session-confirmation (server unicast)
    Pads = 0x65,
    /// PADT - Active Discovery Terminate (either party)
    Padt = 0xA7,
    /// Session data packet
    SessionData = 0x00,
}

impl PppoeCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x09 => Some(Self::Padi),
            0x07 => Some(Self::Pado),
            0x19 => Some(Self::Padr),
            0x65 => Some(Self::Pads),
            0xA7 => Some(Self::Padt),
            0x00 => Some(Self::SessionData),
            _ => None,
        }
    }
}

/// PPPoE Tag types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum TagType {
    EndOfList = 0x0000,
    ServiceName = 0x0101,
    /// Access Concentrator name
    AcName = 0x0102,
    /// Host unique identifier, echoed unmodified by the peer
    HostUniq = 0x0103,
    AcCookie = 0x0104,
    VendorSpecific = 0x0105,
    RelaySessionId = 0x0110,
    ServiceNameError = 0x0201,
    AcSystemError = 0x0202,
    GenericError = 0x0203,
}

impl TagType {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0000 => Some(Self::EndOfList),
            0x0101 => Some(Self::ServiceName),
            0x0102 => Some(Self::AcName),
            0x0103 => Some(Self::HostUniq),
            0x0104 => Some(Self::AcCookie),
            0x0105 => Some(Self::VendorSpecific),
            0x0110 => Some(Self::RelaySessionId),
            0x0201 => Some(Self::ServiceNameError),
            0x0202 => Some(Self::AcSystemError),
            0x0203 => Some(Self::GenericError),
            _ => None,
        }
    }
}

/// PPPoE header (6 bytes): version/type, code, session id, length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PppoeHeader {
    /// Raw version/type byte; valid packets carry [`VER_TYPE`]
    pub ver_type: u8,
    /// Raw code byte
    pub code: u8,
    /// Session id, big-endian on the wire
    pub session_id: u16,
    /// Payload length, big-endian on the wire
    pub length: u16,
}

impl PppoeHeader {
    /// Header size
    pub const LEN: usize = 6;

    /// Construct a well-formed header for transmission.
    pub fn new(code: PppoeCode, session_id: u16, length: u16) -> Self {
        Self {
            ver_type: VER_TYPE,
            code: code as u8,
            session_id,
            length,
        }
    }

    /// True when the version/type byte matches the fixed constant.
    pub fn version_ok(&self) -> bool {
        self.ver_type == VER_TYPE
    }

    /// Parse the header from the front of a PPPoE payload. Returns
    /// `None` when the buffer is too short; the version byte is NOT
    /// validated here — the caller decides whether to drop.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < Self::LEN {
            return None;
        }

        Some(Self {
            ver_type: data[0],
            code: data[1],
            session_id: u16::from_be_bytes([data[2], data[3]]),
            length: u16::from_be_bytes([data[4], data[5]]),
        })
    }

    /// Write the header into the front of a buffer.
    ///
    /// `buf` must hold at least [`PppoeHeader::LEN`] bytes.
    pub fn write(&self, buf: &mut [u8]) {
        buf[0] = self.ver_type;
        buf[1] = self.code;
        buf[2..4].copy_from_slice(&self.session_id.to_be_bytes());
        buf[4..6].copy_from_slice(&self.length.to_be_bytes());
    }
}

/// Append a TLV tag to a transmit buffer, checking remaining capacity
/// against the buffer's fixed end before writing anything.
pub fn append_tag(buf: &mut FrameBuf, tag_type: TagType, value: &[u8]) -> Result<(), CodecError> {
    let needed = 4 + value.len();
    if needed > buf.remaining() {
        return Err(CodecError::PayloadTooLarge {
            needed,
            remaining: buf.remaining(),
        });
    }

    buf.put_slice(&(tag_type as u16).to_be_bytes())?;
    buf.put_slice(&(value.len() as u16).to_be_bytes())?;
    buf.put_slice(value)?;
    Ok(())
}

/// A parsed tag borrowing its value from the packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag<'a> {
    /// Raw tag type; unknown types are skipped by the state machine
    pub raw_type: u16,
    pub value: &'a [u8],
}

impl<'a> Tag<'a> {
    /// The known tag type, if any.
    pub fn tag_type(&self) -> Option<TagType> {
        TagType::from_u16(self.raw_type)
    }
}

/// Forward, non-restartable iterator over the tags of a discovery
/// payload. A tag whose declared length would run past `total_length`
/// yields a single [`CodecError::Malformed`] and then fuses; the
/// caller must discard the whole packet in that case.
pub struct TagIter<'a> {
    data: &'a [u8],
    offset: usize,
    poisoned: bool,
}

impl<'a> TagIter<'a> {
    /// Iterate over `data[..total_length]`. Callers pass the header's
    /// length field; it must already be validated against the buffer.
    pub fn new(data: &'a [u8], total_length: usize) -> Self {
        Self {
            data: &data[..total_length.min(data.len())],
            offset: 0,
            poisoned: false,
        }
    }
}

impl<'a> Iterator for TagIter<'a> {
    type Item = Result<Tag<'a>, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.poisoned {
            return None;
        }

        // A complete tag header no longer fits: end of list.
        if self.offset + 4 > self.data.len() {
            return None;
        }

        let raw_type = u16::from_be_bytes([self.data[self.offset], self.data[self.offset + 1]]);
        let length =
            u16::from_be_bytes([self.data[self.offset + 2], self.data[self.offset + 3]]) as usize;
        let value_start = self.offset + 4;

        if value_start + length > self.data.len() {
            self.poisoned = true;
            return Some(Err(CodecError::Malformed));
        }

        self.offset = value_start + length;
        Some(Ok(Tag {
            raw_type,
            value: &self.data[value_start..value_start + length],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let hdr = PppoeHeader::new(PppoeCode::Pads, 0x1234, 42);
        let mut buf = [0u8; PppoeHeader::LEN];
        hdr.write(&mut buf);

        assert_eq!(buf, [0x11, 0x65, 0x12, 0x34, 0x00, 0x2A]);

        let parsed = PppoeHeader::parse(&buf).unwrap();
        assert_eq!(parsed, hdr);
        assert!(parsed.version_ok());
    }

    #[test]
    fn test_header_bad_version_surfaced_not_rejected() {
        let raw = [0x21, 0x09, 0x00, 0x00, 0x00, 0x00];
        let parsed = PppoeHeader::parse(&raw).unwrap();
        assert!(!parsed.version_ok());
    }

    #[test]
    fn test_header_too_short() {
        assert!(PppoeHeader::parse(&[0x11, 0x09, 0x00]).is_none());
    }

    #[test]
    fn test_append_tag() {
        let mut buf = FrameBuf::new(32);
        append_tag(&mut buf, TagType::ServiceName, b"INTERNET").unwrap();

        assert_eq!(
            buf.as_slice(),
            &[0x01, 0x01, 0x00, 0x08, b'I', b'N', b'T', b'E', b'R', b'N', b'E', b'T']
        );
    }

    #[test]
    fn test_append_tag_capacity_precheck() {
        let mut buf = FrameBuf::new(10);
        // 4-byte TLV header + 8 bytes of value needs 12.
        let err = append_tag(&mut buf, TagType::HostUniq, &[0u8; 8]).unwrap_err();
        assert!(matches!(err, CodecError::PayloadTooLarge { needed: 12, .. }));
        // Nothing partially written.
        assert!(buf.is_empty());
    }

    #[test]
    fn test_tag_iter() {
        let mut buf = FrameBuf::new(64);
        append_tag(&mut buf, TagType::ServiceName, b"svc").unwrap();
        append_tag(&mut buf, TagType::AcName, b"BRAS1").unwrap();
        append_tag(&mut buf, TagType::EndOfList, &[]).unwrap();

        let tags: Vec<_> = TagIter::new(buf.as_slice(), buf.len())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0].tag_type(), Some(TagType::ServiceName));
        assert_eq!(tags[0].value, b"svc");
        assert_eq!(tags[1].tag_type(), Some(TagType::AcName));
        assert_eq!(tags[1].value, b"BRAS1");
        assert_eq!(tags[2].tag_type(), Some(TagType::EndOfList));
    }

    #[test]
    fn test_tag_iter_overrun_poisons() {
        // Declares 16 bytes of value but only 2 follow.
        let raw = [0x01, 0x01, 0x00, 0x10, 0xAA, 0xBB];
        let mut iter = TagIter::new(&raw, raw.len());

        assert_eq!(iter.next(), Some(Err(CodecError::Malformed)));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_tag_iter_respects_total_length() {
        let mut buf = FrameBuf::new(64);
        append_tag(&mut buf, TagType::ServiceName, b"a").unwrap();
        let boundary = buf.len();
        append_tag(&mut buf, TagType::AcName, b"hidden").unwrap();

        // Only the first tag is inside the declared payload length.
        let tags: Vec<_> = TagIter::new(buf.as_slice(), boundary)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn test_code_points() {
        assert_eq!(PppoeCode::from_u8(0x09), Some(PppoeCode::Padi));
        assert_eq!(PppoeCode::from_u8(0x07), Some(PppoeCode::Pado));
        assert_eq!(PppoeCode::from_u8(0x19), Some(PppoeCode::Padr));
        assert_eq!(PppoeCode::from_u8(0x65), Some(PppoeCode::Pads));
        assert_eq!(PppoeCode::from_u8(0xA7), Some(PppoeCode::Padt));
        assert_eq!(PppoeCode::from_u8(0x00), Some(PppoeCode::SessionData));
        assert_eq!(PppoeCode::from_u8(0x42), None);
    }

    #[test]
    fn test_tag_points() {
        assert_eq!(TagType::from_u16(0x0101), Some(TagType::ServiceName));
        assert_eq!(TagType::from_u16(0x0110), Some(TagType::RelaySessionId));
        assert_eq!(TagType::from_u16(0x0203), Some(TagType::GenericError));
        assert_eq!(TagType::from_u16(0x0301), None);
    }
}
