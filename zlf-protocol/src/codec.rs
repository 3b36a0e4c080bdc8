//! Record envelope codec.
//!
//! Envelope format (multi-byte fields little-endian):
//! ```text
//! +-----------+---------+----------+-----------+--------+
//! | Ticks     | Control | Length   | Payload   | Marker |
//! | u64 LE    | u8      | u32 LE   | (N bytes) | u8     |
//! +-----------+---------+----------+-----------+--------+
//! | 8 bytes   | 1 byte  | 4 bytes  | N bytes   | 1 byte |
//! ```
//!
//! Control bit 7 is the direction, bits 0-6 the session id. The trailing
//! marker is never interpreted.

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::DecodeError;
use crate::types::*;

/// One envelope extracted from the capture stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// Tick count with the two reserved high bits cleared.
    pub ticks: u64,
    /// Capture time, millisecond precision.
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    /// Session id (0-127).
    pub session: u8,
    #[serde(skip)]
    pub payload: Bytes,
}

impl Record {
    /// Build a record from raw envelope fields.
    pub fn new(
        ticks: u64,
        direction: Direction,
        session: u8,
        payload: Bytes,
    ) -> Result<Self, DecodeError> {
        let ticks = ticks & TICKS_MASK;
        Ok(Record {
            ticks,
            timestamp: ticks_to_datetime(ticks)?,
            direction,
            session: session & 0x7F,
            payload,
        })
    }

    /// Kind derived from the first payload byte.
    pub fn kind(&self) -> RecordKind {
        RecordKind::from_payload(&self.payload)
    }

    /// Raw control byte.
    pub fn control(&self) -> u8 {
        self.direction.control_bit() | self.session
    }

    /// Size of this record's envelope on the wire.
    pub fn encoded_len(&self) -> usize {
        RECORD_HEADER_SIZE + self.payload.len() + RECORD_TRAILER_SIZE
    }
}

/// Convert masked ticks to an absolute UTC time.
pub fn ticks_to_datetime(ticks: u64) -> Result<DateTime<Utc>, DecodeError> {
    let ticks = ticks & TICKS_MASK;
    let millis = (ticks as i64 - EPOCH_TICKS_OFFSET as i64) / TICKS_PER_MILLISECOND as i64;
    DateTime::<Utc>::from_timestamp_millis(millis).ok_or(DecodeError::InvalidTimestamp(ticks))
}

/// Convert a UTC time back to ticks (millisecond precision).
///
/// Times beyond the tick range saturate.
pub fn datetime_to_ticks(time: DateTime<Utc>) -> u64 {
    let ticks = time
        .timestamp_millis()
        .saturating_mul(TICKS_PER_MILLISECOND as i64)
        .saturating_add(EPOCH_TICKS_OFFSET as i64);
    ticks as u64 & TICKS_MASK
}

fn declared_payload_len(buf: &[u8]) -> Option<u32> {
    let field = buf.get(PAYLOAD_LENGTH_OFFSET..RECORD_HEADER_SIZE)?;
    Some(u32::from_le_bytes(field.try_into().ok()?))
}

/// Total envelope size announced by a buffered header.
///
/// Returns `None` while fewer than [`RECORD_HEADER_SIZE`] bytes are available,
/// or when the announced size does not fit in `usize`.
pub fn record_len(buf: &[u8]) -> Option<usize> {
    let payload_len = usize::try_from(declared_payload_len(buf)?).ok()?;
    RECORD_HEADER_SIZE
        .checked_add(payload_len)?
        .checked_add(RECORD_TRAILER_SIZE)
}

/// Kind of the next record, read from its first payload byte without decoding.
///
/// Returns `None` until the header and one payload byte are buffered. An
/// empty payload classifies as `Unknown(0)` without looking at the trailer.
pub fn peek_record_kind(buf: &[u8]) -> Option<RecordKind> {
    if declared_payload_len(buf)? == 0 {
        return Some(RecordKind::Unknown(0));
    }
    buf.get(RECORD_HEADER_SIZE).map(|&b| RecordKind::from(b))
}

/// Decode one record from a fully buffered envelope.
///
/// The payload is cut to the declared length, or to the bytes available when
/// the slice ends early.
pub fn decode_record(buf: &[u8]) -> Result<Record, DecodeError> {
    if buf.len() < RECORD_HEADER_SIZE {
        return Err(DecodeError::RecordTooShort {
            expected: RECORD_HEADER_SIZE,
            actual: buf.len(),
        });
    }

    let ticks = u64::from_le_bytes(buf[0..8].try_into().unwrap());
    let control = buf[8];
    let payload_len =
        u32::from_le_bytes(buf[PAYLOAD_LENGTH_OFFSET..RECORD_HEADER_SIZE].try_into().unwrap())
            as usize;

    let end = buf.len().min(RECORD_HEADER_SIZE.saturating_add(payload_len));
    let payload = Bytes::copy_from_slice(&buf[RECORD_HEADER_SIZE..end]);

    Record::new(
        ticks,
        Direction::from_control(control),
        control & 0x7F,
        payload,
    )
}

/// Serialize a record envelope with the given trailing marker.
pub fn encode_record(record: &Record, marker: u8) -> Bytes {
    let mut buf = BytesMut::with_capacity(record.encoded_len());
    buf.put_u64_le(record.ticks);
    buf.put_u8(record.control());
    buf.put_u32_le(record.payload.len() as u32);
    buf.put_slice(&record.payload);
    buf.put_u8(marker);
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENVELOPE_100K: &str =
        "41f1d75c4369dd8801170000002101000002003221030dc4a815cd0141040d0a8408ec85fe";

    fn envelope() -> Vec<u8> {
        hex::decode(ENVELOPE_100K).unwrap()
    }

    #[test]
    fn test_decode_record() {
        let record = decode_record(&envelope()).unwrap();
        assert_eq!(record.timestamp.timestamp_millis(), 1_742_649_219_785);
        assert_eq!(record.direction, Direction::Inbound);
        assert_eq!(record.session, 1);
        assert_eq!(record.payload.len(), 0x17);
        assert_eq!(record.kind(), RecordKind::RadioData);
        assert_eq!(record.encoded_len(), envelope().len());
    }

    #[test]
    fn test_decode_too_short() {
        let err = decode_record(&envelope()[..12]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::RecordTooShort {
                expected: 13,
                actual: 12
            }
        );
    }

    #[test]
    fn test_reserved_tick_bits_masked() {
        let mut buf = envelope();
        buf[7] |= 0xC0;
        let masked = decode_record(&buf).unwrap();
        let plain = decode_record(&envelope()).unwrap();
        assert_eq!(masked.ticks, plain.ticks);
        assert_eq!(masked.timestamp, plain.timestamp);
    }

    #[test]
    fn test_outbound_control() {
        let mut buf = envelope();
        buf[8] = 0x85;
        let record = decode_record(&buf).unwrap();
        assert_eq!(record.direction, Direction::Outbound);
        assert_eq!(record.session, 5);
        assert_eq!(record.control(), 0x85);
    }

    #[test]
    fn test_round_trip() {
        let captured = decode_record(&envelope()).unwrap();
        let encoded = encode_record(&captured, 0xFE);
        assert_eq!(&encoded[..], &envelope()[..]);
        assert_eq!(decode_record(&encoded).unwrap(), captured);

        let outbound = Record::new(
            datetime_to_ticks(captured.timestamp),
            Direction::Outbound,
            0x7F,
            Bytes::from_static(&[0x23, 0x05, 0x00]),
        )
        .unwrap();
        let decoded = decode_record(&encode_record(&outbound, 0x00)).unwrap();
        assert_eq!(decoded, outbound);
        assert_eq!(decoded.timestamp, captured.timestamp);
    }

    #[test]
    fn test_round_trip_all_controls() {
        let ticks = decode_record(&envelope()).unwrap().ticks;
        for session in 0..=0x7F {
            for direction in [Direction::Inbound, Direction::Outbound] {
                for len in 0..4u8 {
                    let payload: Vec<u8> = (0..len).map(|i| KIND_RADIO_DATA + i).collect();
                    let record = Record::new(
                        ticks + u64::from(session) * 10_000,
                        direction,
                        session,
                        Bytes::from(payload),
                    )
                    .unwrap();
                    let encoded = encode_record(&record, 0xFE);
                    assert_eq!(encoded.len(), record.encoded_len());
                    assert_eq!(record_len(&encoded), Some(encoded.len()));
                    assert_eq!(decode_record(&encoded).unwrap(), record);
                }
            }
        }
    }

    #[test]
    fn test_max_length_field() {
        let mut buf = envelope();
        buf[9..13].copy_from_slice(&u32::MAX.to_le_bytes());
        let expected = usize::try_from(u32::MAX)
            .ok()
            .and_then(|len| len.checked_add(RECORD_HEADER_SIZE + RECORD_TRAILER_SIZE));
        assert_eq!(record_len(&buf), expected);
        assert_eq!(peek_record_kind(&buf), Some(RecordKind::RadioData));
    }

    #[test]
    fn test_record_len_and_peek() {
        let buf = envelope();
        assert_eq!(record_len(&buf[..12]), None);
        assert_eq!(record_len(&buf[..13]), Some(13 + 0x17 + 1));
        assert_eq!(peek_record_kind(&buf[..13]), None);
        assert_eq!(peek_record_kind(&buf[..14]), Some(RecordKind::RadioData));

        let empty = Record::new(0, Direction::Inbound, 0, Bytes::new()).unwrap();
        let encoded = encode_record(&empty, KIND_RADIO_DATA);
        assert_eq!(peek_record_kind(&encoded[..13]), Some(RecordKind::Unknown(0)));
        assert_eq!(decode_record(&encoded).unwrap().kind(), RecordKind::Unknown(0));
    }

    #[test]
    fn test_ticks_conversion() {
        let time = ticks_to_datetime(EPOCH_TICKS_OFFSET).unwrap();
        assert_eq!(time.timestamp_millis(), 0);
        assert_eq!(datetime_to_ticks(time), EPOCH_TICKS_OFFSET);
    }

    #[test]
    fn test_far_future_ticks_saturate() {
        assert_eq!(datetime_to_ticks(DateTime::<Utc>::MAX_UTC), TICKS_MASK);
    }
}
