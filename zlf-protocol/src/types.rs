//! Value types shared by the ZLF decoders.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Size of the opaque capture file header preceding the first record.
pub const CAPTURE_HEADER_SIZE: usize = 2048;

/// Record envelope header: 8 (ticks) + 1 (control) + 4 (length) = 13 bytes.
pub const RECORD_HEADER_SIZE: usize = 13;

/// Trailing marker byte following every record payload.
pub const RECORD_TRAILER_SIZE: usize = 1;

/// Offset of the little-endian payload length within the envelope.
pub const PAYLOAD_LENGTH_OFFSET: usize = 9;

/// Tick count keeps only the low 62 bits.
pub const TICKS_MASK: u64 = (1 << 62) - 1;

/// Ticks between 0001-01-01 and the Unix epoch (100 ns units).
pub const EPOCH_TICKS_OFFSET: u64 = 621_355_968_000_000_000;

/// Ticks per millisecond.
pub const TICKS_PER_MILLISECOND: u64 = 10_000;

/// Record kind discriminator: tool command (SOCF).
pub const KIND_COMMAND: u8 = 0x23;

/// Record kind discriminator: captured radio data (SODF).
pub const KIND_RADIO_DATA: u8 = 0x21;

/// Direction of a captured record, from bit 7 of the control byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Received from the radio.
    Inbound,
    /// Sent by the controller.
    Outbound,
}

impl Direction {
    /// Extract the direction from a control byte.
    pub fn from_control(control: u8) -> Self {
        if control & 0x80 != 0 {
            Direction::Outbound
        } else {
            Direction::Inbound
        }
    }

    /// Control-byte bit for this direction.
    pub fn control_bit(self) -> u8 {
        match self {
            Direction::Inbound => 0x00,
            Direction::Outbound => 0x80,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Inbound => write!(f, "inbound"),
            Direction::Outbound => write!(f, "outbound"),
        }
    }
}

/// Record kind, taken from the first payload byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// Tool-control message (0x23).
    Command,
    /// Radio capture, or the start of one (0x21).
    RadioData,
    /// Anything else, including continuation fragments.
    Unknown(u8),
}

impl RecordKind {
    /// Classify a record by the first byte of its payload.
    ///
    /// An empty payload classifies as `Unknown(0)`.
    pub fn from_payload(payload: &[u8]) -> Self {
        match payload.first() {
            Some(&byte) => Self::from(byte),
            None => RecordKind::Unknown(0),
        }
    }

    /// Whether a record of this kind starts a new logical unit in the stream.
    pub fn is_boundary(self) -> bool {
        matches!(self, RecordKind::Command | RecordKind::RadioData)
    }
}

impl From<u8> for RecordKind {
    fn from(value: u8) -> Self {
        match value {
            KIND_COMMAND => RecordKind::Command,
            KIND_RADIO_DATA => RecordKind::RadioData,
            other => RecordKind::Unknown(other),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Command => write!(f, "command"),
            RecordKind::RadioData => write!(f, "data"),
            RecordKind::Unknown(b) => write!(f, "unknown(0x{:02X})", b),
        }
    }
}

/// Physical data rate of a captured radio frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataRate {
    /// 9.6 kbit/s (R1).
    Kbps9_6,
    /// 40 kbit/s (R2).
    Kbps40,
    /// 100 kbit/s (R3).
    Kbps100,
    /// Long Range, 100 kbit/s.
    LongRange,
}

impl DataRate {
    /// Map a 5-bit rate code. Only codes 0 to 3 are defined.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(DataRate::Kbps9_6),
            1 => Some(DataRate::Kbps40),
            2 => Some(DataRate::Kbps100),
            3 => Some(DataRate::LongRange),
            _ => None,
        }
    }

    /// Raw rate code.
    pub fn code(self) -> u8 {
        match self {
            DataRate::Kbps9_6 => 0,
            DataRate::Kbps40 => 1,
            DataRate::Kbps100 => 2,
            DataRate::LongRange => 3,
        }
    }

    /// Short label as shown by the capture tool.
    pub fn label(self) -> &'static str {
        match self {
            DataRate::Kbps9_6 => "9K6",
            DataRate::Kbps40 => "40K",
            DataRate::Kbps100 => "100K",
            DataRate::LongRange => "LR",
        }
    }
}

impl fmt::Display for DataRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Radio frame subtype, from the byte following the record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RadioFrameType {
    Command,
    Data,
    BeamFrame,
    BeamStart,
    BeamStop,
}

impl TryFrom<u8> for RadioFrameType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            0x00 => Ok(RadioFrameType::Command),
            0x01 => Ok(RadioFrameType::Data),
            0x02 => Ok(RadioFrameType::BeamFrame),
            0x04 => Ok(RadioFrameType::BeamStart),
            0x05 => Ok(RadioFrameType::BeamStop),
            other => Err(other),
        }
    }
}

impl From<RadioFrameType> for u8 {
    fn from(value: RadioFrameType) -> Self {
        match value {
            RadioFrameType::Command => 0x00,
            RadioFrameType::Data => 0x01,
            RadioFrameType::BeamFrame => 0x02,
            RadioFrameType::BeamStart => 0x04,
            RadioFrameType::BeamStop => 0x05,
        }
    }
}

impl fmt::Display for RadioFrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RadioFrameType::Command => "Command",
            RadioFrameType::Data => "Data",
            RadioFrameType::BeamFrame => "BeamFrame",
            RadioFrameType::BeamStart => "BeamStart",
            RadioFrameType::BeamStop => "BeamStop",
        };
        f.write_str(s)
    }
}

/// Received signal strength.
///
/// The raw byte is a signed dBm value, except for three reserved codes at the
/// top of the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rssi {
    /// Measured strength in dBm (-128 to +124).
    Dbm(i8),
    /// No measurement available (raw 127).
    NotAvailable,
    /// Receiver saturated (raw 126).
    ReceiverSaturated,
    /// No signal detected (raw 125).
    NoSignalDetected,
}

impl Rssi {
    pub const RAW_NOT_AVAILABLE: u8 = 127;
    pub const RAW_RECEIVER_SATURATED: u8 = 126;
    pub const RAW_NO_SIGNAL_DETECTED: u8 = 125;

    /// Interpret a raw signal-strength byte.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            Self::RAW_NOT_AVAILABLE => Rssi::NotAvailable,
            Self::RAW_RECEIVER_SATURATED => Rssi::ReceiverSaturated,
            Self::RAW_NO_SIGNAL_DETECTED => Rssi::NoSignalDetected,
            other => Rssi::Dbm(other as i8),
        }
    }

    /// True for the reserved sentinel values.
    pub fn is_error(self) -> bool {
        !matches!(self, Rssi::Dbm(_))
    }
}

impl fmt::Display for Rssi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rssi::Dbm(v) => write!(f, "{} dBm", v),
            Rssi::NotAvailable => write!(f, "N/A"),
            Rssi::ReceiverSaturated => write!(f, "Receiver saturated"),
            Rssi::NoSignalDetected => write!(f, "No signal detected"),
        }
    }
}

/// Exponential moving average of signal strength.
///
/// `weight` applies to the accumulator. A missing measurement leaves the
/// accumulator unchanged (or 0 when there is none yet); saturation counts as
/// 0 dBm and no signal as -128 dBm.
pub fn average_rssi(acc: Option<i32>, rssi: Rssi, weight: f64) -> i32 {
    let value = match rssi {
        Rssi::NotAvailable => return acc.unwrap_or(0),
        Rssi::ReceiverSaturated => 0,
        Rssi::NoSignalDetected => -128,
        Rssi::Dbm(v) => v as i32,
    };

    match acc {
        None => value,
        Some(acc) => (acc as f64 * weight + value as f64 * (1.0 - weight)).round() as i32,
    }
}

/// Network (home) identifier, displayed as 8 uppercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HomeId(pub u32);

impl HomeId {
    /// Read a big-endian home id from the first 4 bytes of `buf`.
    pub fn from_be_slice(buf: &[u8]) -> Option<Self> {
        let bytes: [u8; 4] = buf.get(..4)?.try_into().ok()?;
        Some(HomeId(u32::from_be_bytes(bytes)))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for HomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

impl Serialize for HomeId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_from_control() {
        assert_eq!(Direction::from_control(0x01), Direction::Inbound);
        assert_eq!(Direction::from_control(0x81), Direction::Outbound);
        assert_eq!(Direction::Outbound.control_bit() | 0x05, 0x85);
    }

    #[test]
    fn test_record_kind() {
        assert_eq!(RecordKind::from_payload(&[0x21, 0x01]), RecordKind::RadioData);
        assert_eq!(RecordKind::from_payload(&[0x23]), RecordKind::Command);
        assert_eq!(RecordKind::from_payload(&[0x84]), RecordKind::Unknown(0x84));
        assert_eq!(RecordKind::from_payload(&[]), RecordKind::Unknown(0));
        assert!(RecordKind::Command.is_boundary());
        assert!(!RecordKind::Unknown(0x00).is_boundary());
    }

    #[test]
    fn test_data_rate_codes() {
        for code in 0..4 {
            assert_eq!(DataRate::from_code(code).unwrap().code(), code);
        }
        assert_eq!(DataRate::from_code(4), None);
        assert_eq!(DataRate::from_code(2).unwrap().to_string(), "100K");
    }

    #[test]
    fn test_radio_frame_type() {
        assert_eq!(RadioFrameType::try_from(0x01), Ok(RadioFrameType::Data));
        assert_eq!(RadioFrameType::try_from(0x03), Err(0x03));
        assert_eq!(u8::from(RadioFrameType::BeamStop), 0x05);
    }

    #[test]
    fn test_rssi_sentinels() {
        assert_eq!(Rssi::from_raw(50), Rssi::Dbm(50));
        assert_eq!(Rssi::from_raw(0xB0), Rssi::Dbm(-80));
        assert_eq!(Rssi::from_raw(127), Rssi::NotAvailable);
        assert_eq!(Rssi::from_raw(126), Rssi::ReceiverSaturated);
        assert_eq!(Rssi::from_raw(125), Rssi::NoSignalDetected);
        assert!(Rssi::from_raw(125).is_error());
        assert_eq!(Rssi::from_raw(0xB0).to_string(), "-80 dBm");
        assert_eq!(Rssi::NotAvailable.to_string(), "N/A");
    }

    #[test]
    fn test_average_rssi() {
        assert_eq!(average_rssi(None, Rssi::NotAvailable, 0.5), 0);
        assert_eq!(average_rssi(Some(-60), Rssi::NotAvailable, 0.5), -60);
        assert_eq!(average_rssi(None, Rssi::Dbm(-70), 0.5), -70);
        assert_eq!(average_rssi(Some(-60), Rssi::Dbm(-80), 0.5), -70);
        assert_eq!(average_rssi(Some(-64), Rssi::ReceiverSaturated, 0.75), -48);
        assert_eq!(average_rssi(Some(0), Rssi::NoSignalDetected, 0.5), -64);
    }

    #[test]
    fn test_home_id_display() {
        let id = HomeId::from_be_slice(&[0xC4, 0xA8, 0x15, 0xCD, 0x01]).unwrap();
        assert_eq!(id.value(), 0xC4A8_15CD);
        assert_eq!(id.to_string(), "C4A815CD");
        assert_eq!(HomeId::from_be_slice(&[0xC4, 0xA8]), None);
    }
}
