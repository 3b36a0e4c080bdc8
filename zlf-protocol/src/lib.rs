//! Decoder for Zniffer ZLF capture files.
//!
//! A capture file is a 2048-byte opaque header followed by a stream of
//! record envelopes. Radio captures may span several records; the
//! [`reader`] reassembles them into [`LogicalDataFrame`]s.
//!
//! # Record Format
//!
//! ```text
//! +-----------+---------+----------+-----------+--------+
//! | Ticks     | Control | Length   | Payload   | Marker |
//! | u64 LE    | u8      | u32 LE   | (N bytes) | u8     |
//! +-----------+---------+----------+-----------+--------+
//! | 8 bytes   | 1 byte  | 4 bytes  | N bytes   | 1 byte |
//! ```
//!
//! The first payload byte is the record kind: `0x23` command, `0x21` radio
//! data, anything else a continuation of the preceding radio capture.
//!
//! # Example
//!
//! ```rust
//! use bytes::{Bytes, BytesMut};
//! use futures_util::stream;
//! use zlf_protocol::read_logical_frame;
//!
//! let envelope = [
//!     0x41, 0xf1, 0xd7, 0x5c, 0x43, 0x69, 0xdd, 0x88, 0x01, 0x17, 0x00, 0x00, 0x00,
//!     0x21, 0x01, 0x00, 0x00, 0x02, 0x00, 0x32, 0x21, 0x03, 0x0d, 0xc4, 0xa8, 0x15,
//!     0xcd, 0x01, 0x41, 0x04, 0x0d, 0x0a, 0x84, 0x08, 0xec, 0x85, 0xfe,
//! ];
//! let mut source = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::copy_from_slice(&envelope))]);
//!
//! let step = futures_executor::block_on(read_logical_frame(&mut source, BytesMut::new()))
//!     .unwrap();
//! let frame = step.output.unwrap();
//! assert_eq!(frame.home_id().unwrap().to_string(), "C4A815CD");
//!
//! let radio = frame.radio_frame().unwrap();
//! assert!(radio.checksum_ok);
//! assert_eq!(radio.mac_header().unwrap().destination_node_id, 10);
//! ```

pub mod checksum;
pub mod codec;
pub mod command;
pub mod error;
pub mod logical;
pub mod mac;
pub mod radio;
pub mod reader;
pub mod source;
pub mod types;

pub use checksum::{crc16_ccitt, validate_mpdu, xor_checksum, xor_checksum_with_seed, ChecksumKind};
pub use codec::{
    datetime_to_ticks, decode_record, encode_record, peek_record_kind, record_len,
    ticks_to_datetime, Record,
};
pub use command::{CommandFrame, FunctionType};
pub use error::{DecodeError, ReadError, ReadFailure};
pub use logical::{CaptureFields, LogicalDataFrame};
pub use mac::{Beaming, FrameControl, HeaderType, MacHeader, MAC_HEADER_SIZE};
pub use radio::RadioFrame;
pub use reader::{
    read_logical_frame, read_record, skip_capture_header, CaptureReader, ReadStep,
};
pub use source::{chunks, DEFAULT_CHUNK_SIZE};
pub use types::{
    average_rssi, DataRate, Direction, HomeId, RadioFrameType, RecordKind, Rssi,
    CAPTURE_HEADER_SIZE, RECORD_HEADER_SIZE, RECORD_TRAILER_SIZE,
};
