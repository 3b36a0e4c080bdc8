//! Logical data frames: one radio capture reassembled from a base radio-data
//! record and the continuation records that follow it.

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::codec::Record;
use crate::error::DecodeError;
use crate::radio::{self, RadioFrame};
use crate::types::{DataRate, Direction, HomeId, RadioFrameType, RecordKind, Rssi};

// Offsets within the reassembled payload, record kind byte included.
const SUBTYPE_OFFSET: usize = 1;
const CHANNEL_RATE_OFFSET: usize = 1 + radio::CHANNEL_RATE_OFFSET;
const REGION_OFFSET: usize = 1 + radio::REGION_OFFSET;
const RSSI_OFFSET: usize = 1 + radio::RSSI_OFFSET;
const MPDU_OFFSET: usize = 1 + radio::MPDU_OFFSET;

/// A reassembled radio capture.
///
/// Derived fields are computed once at construction; the backing records are
/// never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalDataFrame {
    records: Vec<Record>,
    payload: Bytes,
    fields: CaptureFields,
}

/// Capture metadata read straight from the reassembled payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CaptureFields {
    pub channel: Option<u8>,
    pub rate_code: Option<u8>,
    pub region: Option<u8>,
    pub rssi_raw: Option<u8>,
    pub home_id: Option<HomeId>,
    pub source_node_id: Option<u8>,
    pub destination_node_id: Option<u8>,
}

impl CaptureFields {
    fn from_payload(payload: &[u8]) -> Self {
        let at = |offset: usize| payload.get(offset).copied();
        CaptureFields {
            channel: at(CHANNEL_RATE_OFFSET).map(radio::channel),
            rate_code: at(CHANNEL_RATE_OFFSET).map(radio::rate_code),
            region: at(REGION_OFFSET),
            rssi_raw: at(RSSI_OFFSET),
            home_id: payload.get(MPDU_OFFSET..).and_then(HomeId::from_be_slice),
            source_node_id: at(MPDU_OFFSET + 4),
            destination_node_id: at(MPDU_OFFSET + 8),
        }
    }
}

impl LogicalDataFrame {
    /// Assemble a logical frame from its records, base record first.
    pub fn new(records: Vec<Record>) -> Result<Self, DecodeError> {
        let first = records.first().ok_or(DecodeError::EmptyLogicalFrame)?;
        if first.kind() != RecordKind::RadioData {
            return Err(DecodeError::NotRadioData(
                first.payload.first().copied().unwrap_or_default(),
            ));
        }

        let total = records.iter().map(|r| r.payload.len()).sum();
        let mut payload = BytesMut::with_capacity(total);
        for record in &records {
            payload.extend_from_slice(&record.payload);
        }
        let payload = payload.freeze();
        let fields = CaptureFields::from_payload(&payload);

        Ok(LogicalDataFrame {
            records,
            payload,
            fields,
        })
    }

    /// Constituent records, base record first.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Concatenated payloads of all records, kind byte included.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn fields(&self) -> &CaptureFields {
        &self.fields
    }

    /// Timestamp of the last constituent record.
    pub fn timestamp(&self) -> DateTime<Utc> {
        // `new` guarantees at least one record.
        self.records[self.records.len() - 1].timestamp
    }

    pub fn direction(&self) -> Direction {
        self.records[0].direction
    }

    pub fn session(&self) -> u8 {
        self.records[0].session
    }

    /// Number of continuation records folded into this frame.
    pub fn continuation_count(&self) -> usize {
        self.records.len() - 1
    }

    /// Radio subtype byte, if present and defined.
    pub fn frame_type(&self) -> Option<RadioFrameType> {
        self.payload
            .get(SUBTYPE_OFFSET)
            .and_then(|&b| RadioFrameType::try_from(b).ok())
    }

    pub fn channel(&self) -> Option<u8> {
        self.fields.channel
    }

    pub fn data_rate(&self) -> Option<DataRate> {
        self.fields.rate_code.and_then(DataRate::from_code)
    }

    pub fn region(&self) -> Option<u8> {
        self.fields.region
    }

    pub fn rssi(&self) -> Option<Rssi> {
        self.fields.rssi_raw.map(Rssi::from_raw)
    }

    pub fn home_id(&self) -> Option<HomeId> {
        self.fields.home_id
    }

    pub fn source_node_id(&self) -> Option<u8> {
        self.fields.source_node_id
    }

    pub fn destination_node_id(&self) -> Option<u8> {
        self.fields.destination_node_id
    }

    /// Decode the reassembled payload as a radio frame.
    pub fn radio_frame(&self) -> Result<RadioFrame, DecodeError> {
        RadioFrame::decode(&self.payload[1..])
    }
}
