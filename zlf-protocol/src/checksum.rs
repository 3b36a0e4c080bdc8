//! MPDU checksums.
//!
//! Frames at 9.6k and 40k carry a 1-byte XOR checksum; frames at 100k and
//! Long Range carry a CRC-16/CCITT with the network-specific seed 0x1D0F.

use serde::Serialize;

use crate::error::DecodeError;

/// Seed of the XOR checksum used on the air.
pub const XOR_CHECKSUM_SEED: u8 = 0xFF;

/// Initial value of the CRC-16 used on the air.
pub const CRC16_INIT: u16 = 0x1D0F;

/// CRC-16/CCITT polynomial.
pub const CRC16_POLY: u16 = 0x1021;

/// Minimum size of a length-prefixed MPDU accepted by [`validate_mpdu`].
pub const MIN_PREFIXED_MPDU_LEN: usize = 4;

/// Checksum algorithm selected by the data-rate code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChecksumKind {
    /// 1-byte XOR, rate codes 0 and 1.
    Xor8,
    /// 2-byte CRC-16/CCITT, rate codes 2 and above.
    Crc16,
}

impl ChecksumKind {
    /// Select the checksum for a data-rate code.
    pub fn for_rate_code(code: u8) -> Self {
        if code < 2 {
            ChecksumKind::Xor8
        } else {
            ChecksumKind::Crc16
        }
    }

    /// Number of checksum bytes trailing the MPDU.
    pub fn len(self) -> usize {
        match self {
            ChecksumKind::Xor8 => 1,
            ChecksumKind::Crc16 => 2,
        }
    }

    /// Compute the checksum of `data`.
    pub fn compute(self, data: &[u8]) -> u16 {
        match self {
            ChecksumKind::Xor8 => xor_checksum(data) as u16,
            ChecksumKind::Crc16 => crc16_ccitt(data),
        }
    }

    /// Check a declared checksum against `data`.
    pub fn verify(self, data: &[u8], declared: u16) -> bool {
        self.compute(data) == declared
    }

    /// Read a declared checksum (big-endian) from the tail of `buf`.
    pub fn read_declared(self, buf: &[u8]) -> Option<u16> {
        let start = buf.len().checked_sub(self.len())?;
        Some(
            buf[start..]
                .iter()
                .fold(0u16, |acc, &b| (acc << 8) | b as u16),
        )
    }
}

/// XOR checksum seeded with [`XOR_CHECKSUM_SEED`].
pub fn xor_checksum(data: &[u8]) -> u8 {
    xor_checksum_with_seed(data, XOR_CHECKSUM_SEED)
}

/// XOR checksum with an explicit seed.
///
/// Some tooling seeds the accumulator with 0x00 instead of 0xFF.
pub fn xor_checksum_with_seed(data: &[u8], seed: u8) -> u8 {
    data.iter().fold(seed, |acc, &b| acc ^ b)
}

/// CRC-16/CCITT, init 0x1D0F, non-reflected, no final XOR.
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    static CRC_TABLE: [u16; 256] = {
        let mut table = [0u16; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = (i as u16) << 8;
            let mut j = 0;
            while j < 8 {
                if crc & 0x8000 != 0 {
                    crc = (crc << 1) ^ CRC16_POLY;
                } else {
                    crc <<= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = CRC16_INIT;
    for &byte in data {
        let index = ((crc >> 8) ^ byte as u16) as usize;
        crc = (crc << 8) ^ CRC_TABLE[index];
    }
    crc
}

/// Validate a length-prefixed MPDU: `[L][MPDU bytes][checksum]`.
///
/// Returns `Ok(false)` when the length byte disagrees with the buffer size or
/// the checksum does not match.
pub fn validate_mpdu(buf: &[u8], kind: ChecksumKind) -> Result<bool, DecodeError> {
    if buf.len() < MIN_PREFIXED_MPDU_LEN {
        return Err(DecodeError::MpduTooShort {
            expected: MIN_PREFIXED_MPDU_LEN,
            actual: buf.len(),
        });
    }

    if buf.len() != buf[0] as usize + 1 {
        return Ok(false);
    }

    let body = &buf[1..buf.len() - kind.len()];
    let declared = match kind.read_declared(buf) {
        Some(value) => value,
        None => return Ok(false),
    };
    Ok(kind.verify(body, declared))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    #[test]
    fn test_crc16_known_mpdu() {
        let mpdu = bytes("C4A815CD0A41010F013003FF0C87F3");
        let (body, crc) = mpdu.split_at(mpdu.len() - 2);
        assert_eq!(crc16_ccitt(body), 0x87F3);
        assert_eq!(ChecksumKind::Crc16.read_declared(&mpdu), Some(0x87F3));
        assert!(ChecksumKind::Crc16.verify(body, u16::from_be_bytes([crc[0], crc[1]])));
    }

    #[test]
    fn test_crc16_empty_is_seed() {
        assert_eq!(crc16_ccitt(&[]), CRC16_INIT);
    }

    #[test]
    fn test_xor_known_mpdu() {
        let mpdu = bytes("C4A815CD0651010D012001FFCF");
        let (body, cs) = mpdu.split_at(mpdu.len() - 1);
        assert_eq!(xor_checksum(body), cs[0]);
        assert_eq!(xor_checksum_with_seed(body, 0x00), cs[0] ^ 0xFF);
    }

    #[test]
    fn test_checksum_kind_by_rate() {
        assert_eq!(ChecksumKind::for_rate_code(0), ChecksumKind::Xor8);
        assert_eq!(ChecksumKind::for_rate_code(1), ChecksumKind::Xor8);
        assert_eq!(ChecksumKind::for_rate_code(2), ChecksumKind::Crc16);
        assert_eq!(ChecksumKind::for_rate_code(3), ChecksumKind::Crc16);
        assert_eq!(ChecksumKind::Xor8.len(), 1);
        assert_eq!(ChecksumKind::Crc16.len(), 2);
    }

    #[test]
    fn test_repeated_calls_are_stable() {
        let mpdu = bytes("C4A815CD0A41010F013003FF0C");
        let first = crc16_ccitt(&mpdu);
        for _ in 0..8 {
            assert_eq!(crc16_ccitt(&mpdu), first);
            assert_eq!(xor_checksum(&mpdu), xor_checksum(&mpdu));
        }
    }

    #[test]
    fn test_single_bit_flip_detected() {
        let xor_body = bytes("C4A815CD0651010D012001FF");
        let xor_expected = xor_checksum(&xor_body);
        let crc_body = bytes("C4A815CD0A41010F013003FF0C");
        let crc_expected = crc16_ccitt(&crc_body);

        for i in 0..xor_body.len() * 8 {
            let mut flipped = xor_body.clone();
            flipped[i / 8] ^= 1 << (i % 8);
            assert!(!ChecksumKind::Xor8.verify(&flipped, xor_expected as u16));
        }
        for i in 0..crc_body.len() * 8 {
            let mut flipped = crc_body.clone();
            flipped[i / 8] ^= 1 << (i % 8);
            assert!(!ChecksumKind::Crc16.verify(&flipped, crc_expected));
        }
    }

    #[test]
    fn test_validate_mpdu_100k() {
        let mpdu = bytes("0FC4A815CD0A41010F013003FF0C87F3");
        assert_eq!(validate_mpdu(&mpdu, ChecksumKind::Crc16), Ok(true));

        let bad_len = bytes("0EC4A815CD0A41010F013003FF0C87F3");
        assert_eq!(validate_mpdu(&bad_len, ChecksumKind::Crc16), Ok(false));

        assert!(matches!(
            validate_mpdu(&[0x01, 0x02], ChecksumKind::Crc16),
            Err(DecodeError::MpduTooShort { .. })
        ));
    }

    #[test]
    fn test_validate_mpdu_40k() {
        let mpdu = bytes("0DC4A815CD0651010D012001FFCF");
        assert_eq!(validate_mpdu(&mpdu, ChecksumKind::Xor8), Ok(true));

        let corrupted = bytes("13C4A815CD06510213017105000000FF07080089");
        assert_eq!(validate_mpdu(&corrupted, ChecksumKind::Xor8), Ok(false));

        let bad_len = bytes("12C4A815CD06510213017105000000FF07080088");
        assert_eq!(validate_mpdu(&bad_len, ChecksumKind::Xor8), Ok(false));

        assert!(validate_mpdu(&[0x01, 0x02, 0x03], ChecksumKind::Xor8).is_err());
    }
}
