//! Error types for the ZLF decoder.

use bytes::BytesMut;
use thiserror::Error;

/// Structural errors raised while decoding fully buffered bytes.
///
/// Starvation (not enough bytes yet) and checksum mismatches are never
/// reported through this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Record envelope shorter than its fixed header.
    #[error("Record too short: expected at least {expected} bytes, got {actual}")]
    RecordTooShort { expected: usize, actual: usize },

    /// Timestamp ticks precede the Unix epoch by more than chrono can represent.
    #[error("Invalid timestamp ticks: {0}")]
    InvalidTimestamp(u64),

    /// A logical frame was built from no records at all.
    #[error("Logical data frame requires at least one record")]
    EmptyLogicalFrame,

    /// The first record of a logical frame is not a radio-data record.
    #[error("First record must be a radio-data record, got kind 0x{0:02X}")]
    NotRadioData(u8),

    /// Radio payload shorter than the layout requires.
    #[error("Radio payload too short: expected at least {expected} bytes, got {actual}")]
    RadioPayloadTooShort { expected: usize, actual: usize },

    /// Radio frame subtype this decoder does not handle.
    #[error("Unsupported radio frame type: 0x{0:02X}")]
    UnsupportedFrameType(u8),

    /// A fixed marker byte did not hold its expected value.
    #[error("Invalid marker at offset {offset}: expected 0x{expected:02X}, got 0x{actual:02X}")]
    InvalidMarker { offset: usize, expected: u8, actual: u8 },

    /// Header-type code outside the defined set.
    #[error("Unknown MAC header type: 0x{0:X}")]
    UnknownHeaderType(u8),

    /// Header-type code disagrees with the variant the caller asked for.
    #[error("MAC header type mismatch: expected 0x{expected:X}, got 0x{actual:X}")]
    HeaderTypeMismatch { expected: u8, actual: u8 },

    /// Buffer shorter than the 9-byte MAC header.
    #[error("MAC header too short: expected {expected} bytes, got {actual}")]
    MacHeaderTooShort { expected: usize, actual: usize },

    /// Length-prefixed MPDU shorter than the minimum.
    #[error("MPDU too short: expected at least {expected} bytes, got {actual}")]
    MpduTooShort { expected: usize, actual: usize },

    /// Command record payload shorter than its 3-byte header.
    #[error("Command frame too short: expected at least {expected} bytes, got {actual}")]
    CommandTooShort { expected: usize, actual: usize },
}

/// Errors surfaced by the streaming readers.
#[derive(Error, Debug)]
pub enum ReadError {
    /// The chunk source failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Buffered bytes could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
}

/// A failed read, with the buffer as it stood when the error surfaced.
///
/// Bytes already pulled from the source stay in `buffer`, so the read can be
/// retried with it.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct ReadFailure {
    pub buffer: BytesMut,
    #[source]
    pub error: ReadError,
}
