//! Classic MAC header decoding.
//!
//! ```text
//! +---------+--------+---------------+--------+------+
//! | Home ID | Source | Frame control | Length | Dest |
//! | u32 BE  | u8     | 2 bytes       | u8     | u8   |
//! +---------+--------+---------------+--------+------+
//! ```
//!
//! Frame control byte 0: bit 7 routed, bit 6 ack requested, bit 5 low power,
//! bit 4 speed modified, bits 0-3 header type.
//! Frame control byte 1: bits 5-6 beaming info, bits 0-3 sequence number.

use std::fmt;

use serde::Serialize;

use crate::error::DecodeError;
use crate::types::HomeId;

/// Size of the classic MAC header.
pub const MAC_HEADER_SIZE: usize = 9;

/// Offset of the frame-control field within the header.
pub const FRAME_CONTROL_OFFSET: usize = 5;

/// MAC header type, from the low nibble of frame-control byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderType {
    Singlecast,
    Multicast,
    Ack,
    Explorer,
    Routed,
}

impl HeaderType {
    /// 4-bit code carried in the frame control.
    pub fn code(self) -> u8 {
        match self {
            HeaderType::Singlecast => 0x1,
            HeaderType::Multicast => 0x2,
            HeaderType::Ack => 0x3,
            HeaderType::Explorer => 0x5,
            HeaderType::Routed => 0x8,
        }
    }
}

impl TryFrom<u8> for HeaderType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, DecodeError> {
        match value {
            0x1 => Ok(HeaderType::Singlecast),
            0x2 => Ok(HeaderType::Multicast),
            0x3 => Ok(HeaderType::Ack),
            0x5 => Ok(HeaderType::Explorer),
            0x8 => Ok(HeaderType::Routed),
            other => Err(DecodeError::UnknownHeaderType(other)),
        }
    }
}

impl fmt::Display for HeaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HeaderType::Singlecast => "singlecast",
            HeaderType::Multicast => "multicast",
            HeaderType::Ack => "ack",
            HeaderType::Explorer => "explorer",
            HeaderType::Routed => "routed",
        };
        f.write_str(s)
    }
}

/// Beaming information (2 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Beaming {
    None,
    Short,
    Long,
    Reserved,
}

impl Beaming {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Beaming::None,
            0b01 => Beaming::Short,
            0b10 => Beaming::Long,
            _ => Beaming::Reserved,
        }
    }
}

impl fmt::Display for Beaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Beaming::None => "none",
            Beaming::Short => "short",
            Beaming::Long => "long",
            Beaming::Reserved => "reserved",
        };
        f.write_str(s)
    }
}

/// 2-byte frame control, tagged with its validated header type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameControl {
    header_type: HeaderType,
    raw: [u8; 2],
}

impl FrameControl {
    /// Decode a frame control, selecting the header type from its embedded code.
    pub fn parse(raw: [u8; 2]) -> Result<Self, DecodeError> {
        let header_type = HeaderType::try_from(raw[0] & 0x0F)?;
        Ok(FrameControl { header_type, raw })
    }

    /// Decode a frame control that must carry `expected` as its header type.
    pub fn parse_as(raw: [u8; 2], expected: HeaderType) -> Result<Self, DecodeError> {
        let actual = raw[0] & 0x0F;
        if actual != expected.code() {
            return Err(DecodeError::HeaderTypeMismatch {
                expected: expected.code(),
                actual,
            });
        }
        Ok(FrameControl {
            header_type: expected,
            raw,
        })
    }

    pub fn header_type(&self) -> HeaderType {
        self.header_type
    }

    pub fn routed(&self) -> bool {
        self.raw[0] & 0x80 != 0
    }

    /// Acknowledgement requested.
    pub fn ack(&self) -> bool {
        self.raw[0] & 0x40 != 0
    }

    pub fn low_power(&self) -> bool {
        self.raw[0] & 0x20 != 0
    }

    pub fn speed_modified(&self) -> bool {
        self.raw[0] & 0x10 != 0
    }

    pub fn beaming(&self) -> Beaming {
        Beaming::from_bits(self.raw[1] >> 5)
    }

    /// Sequence number (4 bits).
    pub fn sequence_number(&self) -> u8 {
        self.raw[1] & 0x0F
    }

    pub fn raw(&self) -> [u8; 2] {
        self.raw
    }
}

impl Serialize for FrameControl {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("FrameControl", 7)?;
        s.serialize_field("header_type", &self.header_type)?;
        s.serialize_field("routed", &self.routed())?;
        s.serialize_field("ack", &self.ack())?;
        s.serialize_field("low_power", &self.low_power())?;
        s.serialize_field("speed_modified", &self.speed_modified())?;
        s.serialize_field("beaming", &self.beaming())?;
        s.serialize_field("sequence_number", &self.sequence_number())?;
        s.end()
    }
}

/// Decoded classic MAC header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MacHeader {
    pub home_id: HomeId,
    pub source_node_id: u8,
    pub frame_control: FrameControl,
    /// Total MPDU length including the checksum.
    pub length: u8,
    pub destination_node_id: u8,
}

impl MacHeader {
    /// Decode the header from the start of an MPDU.
    ///
    /// Bytes beyond the first nine are ignored.
    pub fn parse(buf: &[u8]) -> Result<Self, DecodeError> {
        let fc = Self::frame_control_bytes(buf)?;
        Self::build(buf, FrameControl::parse(fc)?)
    }

    /// Decode the header, requiring a specific header type.
    pub fn parse_as(buf: &[u8], expected: HeaderType) -> Result<Self, DecodeError> {
        let fc = Self::frame_control_bytes(buf)?;
        Self::build(buf, FrameControl::parse_as(fc, expected)?)
    }

    fn frame_control_bytes(buf: &[u8]) -> Result<[u8; 2], DecodeError> {
        if buf.len() < MAC_HEADER_SIZE {
            return Err(DecodeError::MacHeaderTooShort {
                expected: MAC_HEADER_SIZE,
                actual: buf.len(),
            });
        }
        Ok([buf[FRAME_CONTROL_OFFSET], buf[FRAME_CONTROL_OFFSET + 1]])
    }

    fn build(buf: &[u8], frame_control: FrameControl) -> Result<Self, DecodeError> {
        let home_id = HomeId::from_be_slice(buf).ok_or(DecodeError::MacHeaderTooShort {
            expected: MAC_HEADER_SIZE,
            actual: buf.len(),
        })?;

        Ok(MacHeader {
            home_id,
            source_node_id: buf[4],
            frame_control,
            length: buf[7],
            destination_node_id: buf[8],
        })
    }
}
