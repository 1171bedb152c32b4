//! Request frames sent to the sensor and checks on its responses.
//!
//! Block access requests are addressed (the tag UID follows the command code) and use the high
//! data rate. The custom command is sent unaddressed.

use crate::encoding::{self, HexError};
use lazarus_core::custom_command::REPLY_OK;
use std::str::FromStr;

pub(crate) const BLOCK_SIZE: usize = 8;

const FLAGS_HIGH_DATA_RATE: u8 = 0x02;
const FLAGS_ADDRESSED: u8 = 0x20;

const READ_SINGLE_BLOCK: u8 = 0x20;
const WRITE_SINGLE_BLOCK: u8 = 0x21;
const READ_MULTIPLE_BLOCKS: u8 = 0x23;
const WRITE_MULTIPLE_BLOCKS: u8 = 0x24;

pub(crate) const TI_MANUFACTURER_CODE: u8 = 0x07;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum FrameError {
    #[error("Block data must be a non-zero multiple of {size} bytes, got {0}", size = BLOCK_SIZE)]
    BlockLength(usize),

    #[error("Block count must be between 1 and 256, got {0}")]
    BlockCount(usize),

    #[error("UID must be 8 bytes, got {0}")]
    UidLength(usize),

    #[error(transparent)]
    Hex(#[from] HexError),

    #[error("Empty response")]
    EmptyResponse,

    #[error("Tag reported an error, flags {flags:#04x}, code {code:?}")]
    ErrorResponse { flags: u8, code: Option<u8> },

    #[error("Response holds {0} bytes, expected a 16 bit sample")]
    ShortResponse(usize),
}

/// Tag UID in transmission order, least significant byte first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Uid(pub(crate) [u8; 8]);

impl FromStr for Uid {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = encoding::decode(s)?;
        let len = bytes.len();
        Ok(Self(bytes.try_into().map_err(|_| FrameError::UidLength(len))?))
    }
}

fn addressed(command: u8, uid: &Uid, block: u8) -> Vec<u8> {
    let mut frame = vec![FLAGS_ADDRESSED | FLAGS_HIGH_DATA_RATE, command];
    frame.extend_from_slice(&uid.0);
    frame.push(block);
    frame
}

fn block_count(count: usize) -> Result<u8, FrameError> {
    match count {
        1..=256 => Ok((count - 1) as u8),
        _ => Err(FrameError::BlockCount(count)),
    }
}

pub(crate) fn read_single_block(uid: &Uid, block: u8) -> Vec<u8> {
    addressed(READ_SINGLE_BLOCK, uid, block)
}

pub(crate) fn read_multiple_blocks(
    uid: &Uid,
    block: u8,
    count: usize,
) -> Result<Vec<u8>, FrameError> {
    let mut frame = addressed(READ_MULTIPLE_BLOCKS, uid, block);
    frame.push(block_count(count)?);
    Ok(frame)
}

pub(crate) fn write_single_block(
    uid: &Uid,
    block: u8,
    data: &[u8],
) -> Result<Vec<u8>, FrameError> {
    if data.len() != BLOCK_SIZE {
        return Err(FrameError::BlockLength(data.len()));
    }

    let mut frame = addressed(WRITE_SINGLE_BLOCK, uid, block);
    frame.extend_from_slice(data);
    Ok(frame)
}

pub(crate) fn write_multiple_blocks(
    uid: &Uid,
    block: u8,
    data: &[u8],
) -> Result<Vec<u8>, FrameError> {
    if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
        return Err(FrameError::BlockLength(data.len()));
    }

    let mut frame = addressed(WRITE_MULTIPLE_BLOCKS, uid, block);
    frame.push(block_count(data.len() / BLOCK_SIZE)?);
    frame.extend_from_slice(data);
    Ok(frame)
}

/// Request for a custom command of the TI ROM stack.
pub(crate) fn custom_command(command: u8) -> [u8; 3] {
    [FLAGS_HIGH_DATA_RATE, command, TI_MANUFACTURER_CODE]
}

/// Strips the response flags, failing if they report an error.
pub(crate) fn check_response(response: &[u8]) -> Result<&[u8], FrameError> {
    match response {
        [] => Err(FrameError::EmptyResponse),
        [REPLY_OK, payload @ ..] => Ok(payload),
        [flags, rest @ ..] => Err(FrameError::ErrorResponse {
            flags: *flags,
            code: rest.first().copied(),
        }),
    }
}

/// Raw converter result carried by a custom command response.
pub(crate) fn decode_sample(response: &[u8]) -> Result<u16, FrameError> {
    match check_response(response)? {
        [lo, hi, ..] => Ok(u16::from_le_bytes([*lo, *hi])),
        payload => Err(FrameError::ShortResponse(payload.len())),
    }
}
