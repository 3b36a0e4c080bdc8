//! Tool command records.
//!
//! Payload layout: `[0x23][function][length][body...]`. The declared length
//! is informational; the body is cut to what the record actually carries.

use std::fmt;

use bytes::Bytes;
use serde::Serialize;

use crate::error::DecodeError;

/// Bytes before the command body.
pub const COMMAND_HEADER_SIZE: usize = 3;

/// Capture tool function codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FunctionType {
    GetVersion,
    SetFrequency,
    GetFrequencies,
    Start,
    Stop,
    SetLRChannelConfig,
    GetLRChannelConfigs,
    GetLRRegions,
    SetBaudRate,
    GetFrequencyInfo,
    GetLRChannelConfigInfo,
    Unknown(u8),
}

impl From<u8> for FunctionType {
    fn from(value: u8) -> Self {
        match value {
            0x01 => FunctionType::GetVersion,
            0x02 => FunctionType::SetFrequency,
            0x03 => FunctionType::GetFrequencies,
            0x04 => FunctionType::Start,
            0x05 => FunctionType::Stop,
            0x06 => FunctionType::SetLRChannelConfig,
            0x07 => FunctionType::GetLRChannelConfigs,
            0x08 => FunctionType::GetLRRegions,
            0x0E => FunctionType::SetBaudRate,
            0x13 => FunctionType::GetFrequencyInfo,
            0x14 => FunctionType::GetLRChannelConfigInfo,
            other => FunctionType::Unknown(other),
        }
    }
}

impl From<FunctionType> for u8 {
    fn from(value: FunctionType) -> Self {
        match value {
            FunctionType::GetVersion => 0x01,
            FunctionType::SetFrequency => 0x02,
            FunctionType::GetFrequencies => 0x03,
            FunctionType::Start => 0x04,
            FunctionType::Stop => 0x05,
            FunctionType::SetLRChannelConfig => 0x06,
            FunctionType::GetLRChannelConfigs => 0x07,
            FunctionType::GetLRRegions => 0x08,
            FunctionType::SetBaudRate => 0x0E,
            FunctionType::GetFrequencyInfo => 0x13,
            FunctionType::GetLRChannelConfigInfo => 0x14,
            FunctionType::Unknown(code) => code,
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionType::Unknown(code) => write!(f, "Unknown(0x{:02X})", code),
            other => write!(f, "{:?}", other),
        }
    }
}

/// A decoded command record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandFrame {
    pub function: FunctionType,
    /// Body length as declared in the record.
    pub declared_length: u8,
    #[serde(skip)]
    pub body: Bytes,
}

impl CommandFrame {
    /// Decode a command record payload, kind byte included.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        if payload.len() < COMMAND_HEADER_SIZE {
            return Err(DecodeError::CommandTooShort {
                expected: COMMAND_HEADER_SIZE,
                actual: payload.len(),
            });
        }

        let declared_length = payload[2];
        let end = payload
            .len()
            .min(COMMAND_HEADER_SIZE + declared_length as usize);

        Ok(CommandFrame {
            function: FunctionType::from(payload[1]),
            declared_length,
            body: Bytes::copy_from_slice(&payload[COMMAND_HEADER_SIZE..end]),
        })
    }

    /// Whether the record carried the full declared body.
    pub fn is_complete(&self) -> bool {
        self.body.len() == self.declared_length as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_start() {
        let frame = CommandFrame::decode(&[0x23, 0x04, 0x00]).unwrap();
        assert_eq!(frame.function, FunctionType::Start);
        assert!(frame.body.is_empty());
        assert!(frame.is_complete());
    }

    #[test]
    fn test_decode_with_body() {
        let payload = hex::decode("2302010001").unwrap();
        let frame = CommandFrame::decode(&payload).unwrap();
        assert_eq!(frame.function, FunctionType::SetFrequency);
        assert_eq!(&frame.body[..], &[0x00]);
        assert!(!frame.is_complete());

        let payload = hex::decode("231302aabbcc").unwrap();
        let frame = CommandFrame::decode(&payload).unwrap();
        assert_eq!(frame.function, FunctionType::GetFrequencyInfo);
        assert_eq!(&frame.body[..], &[0xAA, 0xBB]);
        assert!(frame.is_complete());
    }

    #[test]
    fn test_decode_too_short() {
        assert_eq!(
            CommandFrame::decode(&[0x23, 0x04]),
            Err(DecodeError::CommandTooShort {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_function_codes() {
        for code in [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x0E, 0x13, 0x14] {
            let function = FunctionType::from(code);
            assert!(!matches!(function, FunctionType::Unknown(_)));
            assert_eq!(u8::from(function), code);
        }
        assert_eq!(FunctionType::from(0x42), FunctionType::Unknown(0x42));
        assert_eq!(FunctionType::from(0x42).to_string(), "Unknown(0x42)");
        assert_eq!(FunctionType::Stop.to_string(), "Stop");
    }
}
