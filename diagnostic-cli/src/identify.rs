//! Recognising sensors from their UID, header blocks and program key.

use crate::{
    checksum::{HeaderCheck, HEADER_LEN},
    iso15693::{Uid, BLOCK_SIZE, TI_MANUFACTURER_CODE},
    plan::{PROGRAM_KEY, PROGRAM_KEY_OFFSET},
};
use std::fmt;

/// Last UID byte of every ISO15693 tag.
const UID_MARKER: u8 = 0xE0;

/// The program key shares its location with the sensor's runtime in minutes, which never
/// exceeds 14 days.
const SENSOR_LIFETIME_MINUTES: u16 = 14 * 24 * 60;

/// Program keys from here on mark reprogrammed sensors.
const REPROGRAMMED_KEYS: u16 = 0x8000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum IdentifyError {
    #[error("UID ends in {0:02X?}, not a TI tag")]
    WrongManufacturer([u8; 2]),

    #[error("Header must be {expected} bytes, got {0}", expected = HEADER_LEN)]
    HeaderLength(usize),

    #[error("Header checksum is {stored:#06x}, computed {computed:#06x}")]
    BadChecksum { stored: u16, computed: u16 },

    #[error("Block must be {size} bytes, got {0}", size = BLOCK_SIZE)]
    BlockLength(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sensor {
    /// Original firmware, still within its lifetime.
    Running { minutes: u16 },

    /// Original firmware past its lifetime, ready to be programmed.
    Programmable { key: u16 },

    Thermometer,

    /// Reprogrammed with something else.
    Foreign { key: u16 },
}

impl Sensor {
    pub(crate) fn classify(key: u16) -> Self {
        match key {
            minutes if minutes <= SENSOR_LIFETIME_MINUTES => Self::Running { minutes },
            key if key < REPROGRAMMED_KEYS => Self::Programmable { key },
            PROGRAM_KEY => Self::Thermometer,
            key => Self::Foreign { key },
        }
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running { minutes } => {
                write!(f, "sensor in use, running for {minutes} minutes")
            }
            Self::Programmable { key } => {
                write!(f, "expired sensor (key {key:#06x}), programmable")
            }
            Self::Thermometer => write!(f, "thermometer"),
            Self::Foreign { key } => {
                write!(f, "sensor running other firmware (key {key:#06x})")
            }
        }
    }
}

/// Reads the program key from blocks 0 to 2 and the block holding the key.
pub(crate) fn program_key(
    uid: &Uid,
    header: &[u8],
    key_block: &[u8],
) -> Result<u16, IdentifyError> {
    let [.., manufacturer, marker] = uid.0;
    if manufacturer != TI_MANUFACTURER_CODE || marker != UID_MARKER {
        return Err(IdentifyError::WrongManufacturer([manufacturer, marker]));
    }

    let check = match HeaderCheck::of(header) {
        Some(check) if header.len() == HEADER_LEN => check,
        _ => return Err(IdentifyError::HeaderLength(header.len())),
    };
    if !check.is_valid() {
        return Err(IdentifyError::BadChecksum {
            stored: check.stored,
            computed: check.computed,
        });
    }

    if key_block.len() != BLOCK_SIZE {
        return Err(IdentifyError::BlockLength(key_block.len()));
    }
    let offset = PROGRAM_KEY_OFFSET % BLOCK_SIZE;
    Ok(u16::from_le_bytes([key_block[offset], key_block[offset + 1]]))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::checksum::checksum;

    const UID: Uid = Uid([0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x07, 0xE0]);

    fn header() -> Vec<u8> {
        let mut header = vec![0x5Au8; HEADER_LEN];
        let crc = checksum(&header[2..]);
        header[..2].copy_from_slice(&crc.to_le_bytes());
        header
    }

    fn key_block(key: u16) -> [u8; BLOCK_SIZE] {
        let mut block = [0xFF; BLOCK_SIZE];
        block[4..6].copy_from_slice(&key.to_le_bytes());
        block
    }

    #[test]
    fn reads_key() {
        assert_eq!(
            program_key(&UID, &header(), &key_block(0x8001)),
            Ok(0x8001)
        );
    }

    #[test]
    fn rejects_other_manufacturers() {
        let uid = Uid([0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x04, 0xE0]);
        assert_eq!(
            program_key(&uid, &header(), &key_block(0x8001)),
            Err(IdentifyError::WrongManufacturer([0x04, 0xE0]))
        );
    }

    #[test]
    fn rejects_bad_header() {
        let mut header = header();
        header[7] ^= 0x01;
        assert!(matches!(
            program_key(&UID, &header, &key_block(0x8001)),
            Err(IdentifyError::BadChecksum { .. })
        ));

        assert_eq!(
            program_key(&UID, &header[..16], &key_block(0x8001)),
            Err(IdentifyError::HeaderLength(16))
        );
    }

    #[test]
    fn rejects_short_block() {
        assert_eq!(
            program_key(&UID, &header(), &[0x00; 4]),
            Err(IdentifyError::BlockLength(4))
        );
    }

    #[test]
    fn classification() {
        assert_eq!(Sensor::classify(0), Sensor::Running { minutes: 0 });
        assert_eq!(
            Sensor::classify(SENSOR_LIFETIME_MINUTES),
            Sensor::Running { minutes: 20160 }
        );
        assert_eq!(
            Sensor::classify(SENSOR_LIFETIME_MINUTES + 1),
            Sensor::Programmable { key: 20161 }
        );
        assert_eq!(
            Sensor::classify(0x7FFF),
            Sensor::Programmable { key: 0x7FFF }
        );
        assert_eq!(Sensor::classify(PROGRAM_KEY), Sensor::Thermometer);
        assert_eq!(Sensor::classify(0x8000), Sensor::Foreign { key: 0x8000 });
        assert_eq!(Sensor::classify(0xFFFF), Sensor::Foreign { key: 0xFFFF });
    }
}
