//! Checksum protecting the sensor's FRAM header.
//!
//! This is CRC-16/MCRF4XX (reflected CCITT polynomial, initial value `0xFFFF`, no final XOR)
//! with the bits of the result reversed.

use crc::{Crc, CRC_16_MCRF4XX};

/// Bytes covered by the header checksum, which is stored little endian in bytes `0..2`.
pub(crate) const HEADER_LEN: usize = 0x18;

pub(crate) const CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_MCRF4XX);

pub(crate) fn checksum(bytes: &[u8]) -> u16 {
    CRC.checksum(bytes).reverse_bits()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HeaderCheck {
    pub(crate) stored: u16,
    pub(crate) computed: u16,
}

impl HeaderCheck {
    /// Checks the first [`HEADER_LEN`] bytes of `data`, `None` if there are fewer.
    pub(crate) fn of(data: &[u8]) -> Option<Self> {
        let header = data.get(..HEADER_LEN)?;

        Some(Self {
            stored: u16::from_le_bytes([header[0], header[1]]),
            computed: checksum(&header[2..]),
        })
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.stored == self.computed
    }
}
