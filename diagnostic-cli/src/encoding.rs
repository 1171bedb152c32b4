//! Hex strings as typed on the command line: pairs of digits, optionally separated by
//! whitespace.

use hex::FromHexError;
use std::num::ParseIntError;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum HexError {
    #[error("Odd number of hex digits")]
    OddLength,

    #[error("Invalid hex digit {c:?} at position {index}")]
    InvalidDigit { c: char, index: usize },
}

impl From<FromHexError> for HexError {
    fn from(e: FromHexError) -> Self {
        match e {
            FromHexError::InvalidHexCharacter { c, index } => Self::InvalidDigit { c, index },
            FromHexError::OddLength | FromHexError::InvalidStringLength => Self::OddLength,
        }
    }
}

/// Decodes hex digits, ignoring whitespace.
pub(crate) fn decode(s: &str) -> Result<Vec<u8>, HexError> {
    let digits: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(hex::decode(digits)?)
}

/// Upper case digits, bytes separated by a space.
pub(crate) fn encode(bytes: &[u8]) -> String {
    bytes
        .chunks(1)
        .map(hex::encode_upper)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses a number given in decimal or as `0x` prefixed hex.
pub(crate) fn parse_u16(s: &str) -> Result<u16, ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(digits) => u16::from_str_radix(digits, 16),
        None => s.parse(),
    }
}
