//! Radio frame decoding.
//!
//! Layout of a radio-data payload once the record kind byte is removed:
//! ```text
//! 0      subtype (Data / BeamStart / BeamStop)
//! 1..3   reserved
//! 3      channel (bits 5-7) | rate code (bits 0-4)
//! 4      region
//! 5      rssi
//! 6..9   markers, depending on subtype (Data: 0x21 0x03, MPDU length)
//! 9..    MPDU, followed by a 1- or 2-byte checksum
//! ```

use bytes::Bytes;
use log::debug;
use serde::Serialize;

use crate::checksum::ChecksumKind;
use crate::error::DecodeError;
use crate::mac::MacHeader;
use crate::types::{DataRate, HomeId, RadioFrameType, Rssi};

/// Minimum radio payload carrying channel, region and rssi.
pub const MIN_RADIO_PAYLOAD: usize = 6;

/// Offset of the channel / rate byte.
pub const CHANNEL_RATE_OFFSET: usize = 3;

/// Offset of the region byte.
pub const REGION_OFFSET: usize = 4;

/// Offset of the raw signal-strength byte.
pub const RSSI_OFFSET: usize = 5;

/// Offset of the MPDU length byte in Data frames.
pub const MPDU_LENGTH_OFFSET: usize = 8;

/// Offset of the MPDU in Data frames.
pub const MPDU_OFFSET: usize = 9;

/// Markers preceding the MPDU length byte in Data frames.
const DATA_MARKERS: [(usize, u8); 2] = [(6, 0x21), (7, 0x03)];

/// Marker opening a BeamStart body.
const BEAM_START_MARKER: (usize, u8) = (6, 0x55);

/// Channel number from the channel / rate byte.
pub fn channel(byte: u8) -> u8 {
    byte >> 5
}

/// Rate code from the channel / rate byte.
pub fn rate_code(byte: u8) -> u8 {
    byte & 0x1F
}

/// A decoded radio frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RadioFrame {
    pub frame_type: RadioFrameType,
    /// Channel (0-7).
    pub channel: u8,
    /// Raw 5-bit rate code.
    pub rate_code: u8,
    pub region: u8,
    pub rssi_raw: u8,
    /// MPDU length byte, Data frames only.
    pub mpdu_length: Option<u8>,
    /// Inner MPDU (Data), beam body (BeamStart) or empty (BeamStop).
    #[serde(skip)]
    pub payload: Bytes,
    /// Declared checksum, when the subtype carries one.
    pub checksum: Option<u16>,
    /// Always true for subtypes without a checksum.
    pub checksum_ok: bool,
    pub home_id: Option<HomeId>,
    pub source_node_id: Option<u8>,
    pub destination_node_id: Option<u8>,
}

impl RadioFrame {
    /// Decode a radio payload with the record kind byte already removed.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < MIN_RADIO_PAYLOAD {
            return Err(DecodeError::RadioPayloadTooShort {
                expected: MIN_RADIO_PAYLOAD,
                actual: data.len(),
            });
        }

        let frame_type =
            RadioFrameType::try_from(data[0]).map_err(DecodeError::UnsupportedFrameType)?;
        let channel = channel(data[CHANNEL_RATE_OFFSET]);
        let rate_code = rate_code(data[CHANNEL_RATE_OFFSET]);

        let mut frame = RadioFrame {
            frame_type,
            channel,
            rate_code,
            region: data[REGION_OFFSET],
            rssi_raw: data[RSSI_OFFSET],
            mpdu_length: None,
            payload: Bytes::new(),
            checksum: None,
            checksum_ok: true,
            home_id: None,
            source_node_id: None,
            destination_node_id: None,
        };

        match frame_type {
            RadioFrameType::Data => frame.decode_data(data)?,
            RadioFrameType::BeamStart => {
                expect_marker(data, BEAM_START_MARKER)?;
                frame.payload = Bytes::copy_from_slice(&data[BEAM_START_MARKER.0..]);
            }
            RadioFrameType::BeamStop => {}
            other => return Err(DecodeError::UnsupportedFrameType(u8::from(other))),
        }

        Ok(frame)
    }

    fn decode_data(&mut self, data: &[u8]) -> Result<(), DecodeError> {
        let kind = ChecksumKind::for_rate_code(self.rate_code);
        let expected = MPDU_OFFSET + kind.len();
        if data.len() < expected {
            return Err(DecodeError::RadioPayloadTooShort {
                expected,
                actual: data.len(),
            });
        }
        for marker in DATA_MARKERS {
            expect_marker(data, marker)?;
        }

        let mpdu = &data[MPDU_OFFSET..data.len() - kind.len()];
        let declared = kind.read_declared(data).unwrap_or_default();

        self.mpdu_length = Some(data[MPDU_LENGTH_OFFSET]);
        self.checksum = Some(declared);
        self.checksum_ok = kind.verify(mpdu, declared);
        self.home_id = HomeId::from_be_slice(mpdu);
        self.source_node_id = mpdu.get(4).copied();
        self.destination_node_id = mpdu.get(8).copied();
        self.payload = Bytes::copy_from_slice(mpdu);

        if !self.checksum_ok {
            debug!(
                "Checksum mismatch: declared=0x{:04X}, computed=0x{:04X} ({:?})",
                declared,
                kind.compute(mpdu),
                kind
            );
        }
        Ok(())
    }

    /// Data rate, when the code is one of the four defined values.
    pub fn data_rate(&self) -> Option<DataRate> {
        DataRate::from_code(self.rate_code)
    }

    /// Checksum algorithm implied by the rate code.
    pub fn checksum_kind(&self) -> ChecksumKind {
        ChecksumKind::for_rate_code(self.rate_code)
    }

    pub fn rssi(&self) -> Rssi {
        Rssi::from_raw(self.rssi_raw)
    }

    /// Classic MAC header of the inner MPDU.
    pub fn mac_header(&self) -> Result<MacHeader, DecodeError> {
        MacHeader::parse(&self.payload)
    }
}

fn expect_marker(data: &[u8], (offset, expected): (usize, u8)) -> Result<(), DecodeError> {
    match data.get(offset) {
        Some(&actual) if actual == expected => Ok(()),
        Some(&actual) => Err(DecodeError::InvalidMarker {
            offset,
            expected,
            actual,
        }),
        None => Err(DecodeError::RadioPayloadTooShort {
            expected: offset + 1,
            actual: data.len(),
        }),
    }
}
