//! Ethernet II framing for the PPPoE discovery and session ethertypes

use std::fmt;
use std::str::FromStr;

/// MAC address (6 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// Broadcast MAC address (FF:FF:FF:FF:FF:FF)
    pub const BROADCAST: MacAddr = MacAddr([0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);

    /// Zero MAC address (00:00:00:00:00:00)
    pub const ZERO: MacAddr = MacAddr([0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

    /// Create a new MAC address from a byte array
    pub const fn new(bytes: [u8; 6]) -> Self {
        MacAddr(bytes)
    }

    /// Create a MAC address from a slice
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() == 6 {
            let mut bytes = [0u8; 6];
            bytes.copy_from_slice(slice);
            Some(MacAddr(bytes))
        } else {
            None
        }
    }

    /// Get the MAC address as a byte slice
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Convert to an array
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Check if this is the all-zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0x00; 6]
    }

    /// Check if this is the broadcast address
    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xFF; 6]
    }

    /// Check if this is a multicast address (bit 0 of first octet is 1)
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 == 0x01
    }

    /// Check if this is a unicast address
    pub fn is_unicast(&self) -> bool {
        !self.is_multicast() && !self.is_broadcast()
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(format!("invalid MAC address format: {s}"));
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            bytes[i] = u8::from_str_radix(part, 16)
                .map_err(|_| format!("invalid MAC address hex: {s}"))?;
        }

        Ok(MacAddr(bytes))
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(bytes: [u8; 6]) -> Self {
        MacAddr(bytes)
    }
}

/// EtherType of a received or outbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtherType {
    /// PPPoE Discovery stage (0x8863)
    Discovery,
    /// PPPoE Session stage (0x8864)
    Session,
    /// Anything else; dropped by the client
    Other(u16),
}

impl EtherType {
    /// Convert EtherType to its u16 value
    pub fn to_u16(self) -> u16 {
        match self {
            EtherType::Discovery => 0x8863,
            EtherType::Session => 0x8864,
            EtherType::Other(val) => val,
        }
    }

    /// Create EtherType from a u16 value
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x8863 => EtherType::Discovery,
            0x8864 => EtherType::Session,
            val => EtherType::Other(val),
        }
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtherType::Discovery => write!(f, "PPPoE-Discovery"),
            EtherType::Session => write!(f, "PPPoE-Session"),
            EtherType::Other(val) => write!(f, "0x{val:04X}"),
        }
    }
}

/// Ethernet II header (14 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    /// Destination MAC address
    pub dst: MacAddr,
    /// Source MAC address
    pub src: MacAddr,
    /// EtherType field
    pub ethertype: EtherType,
}

impl EthernetHeader {
    /// Header size (dst + src + type)
    pub const LEN: usize = 14;

    /// Minimum Ethernet frame size on the wire (without FCS)
    pub const MIN_FRAME_SIZE: usize = 60;

    /// Parse the header from the front of a frame
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < Self::LEN {
            return None;
        }

        let dst = MacAddr::from_slice(&data[0..6])?;
        let src = MacAddr::from_slice(&data[6..12])?;
        let ethertype = EtherType::from_u16(u16::from_be_bytes([data[12], data[13]]));

        Some(EthernetHeader { dst, src, ethertype })
    }

    /// Write the header into the front of a frame buffer.
    ///
    /// `buf` must hold at least [`EthernetHeader::LEN`] bytes.
    pub fn write(&self, buf: &mut [u8]) {
        buf[0..6].copy_from_slice(self.dst.as_bytes());
        buf[6..12].copy_from_slice(self.src.as_bytes());
        buf[12..14].copy_from_slice(&self.ethertype.to_u16().to_be_bytes());
    }
}
