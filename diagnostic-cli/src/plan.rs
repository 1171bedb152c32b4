//! Validation of a firmware payload and its split into ISO15693 block writes.

use crate::{
    checksum::{HeaderCheck, HEADER_LEN},
    iso15693::{self, FrameError, Uid, BLOCK_SIZE},
    titxt::{self, ParseError},
};
use log::debug;

/// Address of block 0 of the sensor's 8 byte block memory.
pub(crate) const BASE_ADDRESS: u32 = 0xF860;

/// Marks sensors running the thermometer firmware.
pub(crate) const PROGRAM_KEY: u16 = 0x8001;

/// Byte offset of the program key from [`BASE_ADDRESS`].
pub(crate) const PROGRAM_KEY_OFFSET: usize = 0x13C;

const PROGRAM_KEY_BLOCK: usize = PROGRAM_KEY_OFFSET / BLOCK_SIZE;

/// Blocks holding the checksummed header, written all at once or not at all.
const FIRST_AREA_BLOCKS: usize = 3;

const MAX_BLOCKS_PER_WRITE: usize = 2;

const END_ADDRESS: u32 = 0x1_0000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum PlanError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Section at {0:#06x} is not aligned to a block")]
    Misaligned(u32),

    #[error("Section at {0:#06x} starts before the block memory")]
    BeforeBase(u32),

    #[error("Section at {address:#06x} has {len} bytes, not whole blocks within memory")]
    BadLength { address: u32, len: usize },

    #[error("Section covering blocks {start}..{end} splits the first area")]
    SplitsFirstArea { start: usize, end: usize },

    #[error("No section holds the program key")]
    MissingProgramKey,

    #[error("Program key is {0:#06x}, expected {expected:#06x}", expected = PROGRAM_KEY)]
    WrongProgramKey(u16),

    #[error("Header checksum is {stored:#06x}, computed {computed:#06x}")]
    BadChecksum { stored: u16, computed: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DeliverySection {
    pub(crate) initial_block: u8,
    pub(crate) data: Vec<u8>,
}

impl DeliverySection {
    fn blocks(&self) -> std::ops::Range<usize> {
        let start = usize::from(self.initial_block);
        start..start + self.data.len() / BLOCK_SIZE
    }
}

/// One write command: a single block, or [`MAX_BLOCKS_PER_WRITE`] consecutive blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockWrite<'a> {
    pub(crate) block: u8,
    pub(crate) data: &'a [u8],
}

impl BlockWrite<'_> {
    pub(crate) fn frame(&self, uid: &Uid) -> Result<Vec<u8>, FrameError> {
        if self.data.len() == BLOCK_SIZE {
            iso15693::write_single_block(uid, self.block, self.data)
        } else {
            iso15693::write_multiple_blocks(uid, self.block, self.data)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DeliveryPlan {
    sections: Vec<DeliverySection>,
}

impl DeliveryPlan {
    pub(crate) fn from_titxt(text: &str) -> Result<Self, PlanError> {
        let mut sections = Vec::new();
        let mut program_key = None;

        for (address, data) in titxt::parse(text)? {
            let section = section(address, data)?;
            let blocks = section.blocks();
            debug!("Section at {:#06x} covers blocks {:?}", address, blocks);

            if blocks.start < FIRST_AREA_BLOCKS
                && (blocks.start != 0 || blocks.end < FIRST_AREA_BLOCKS)
            {
                return Err(PlanError::SplitsFirstArea {
                    start: blocks.start,
                    end: blocks.end,
                });
            }

            if blocks.start == 0 {
                // The first area is at least HEADER_LEN bytes long
                if let Some(check) = HeaderCheck::of(&section.data) {
                    if !check.is_valid() {
                        return Err(PlanError::BadChecksum {
                            stored: check.stored,
                            computed: check.computed,
                        });
                    }
                }
            }

            if blocks.contains(&PROGRAM_KEY_BLOCK) {
                let offset = PROGRAM_KEY_OFFSET - blocks.start * BLOCK_SIZE;
                program_key = Some(u16::from_le_bytes([
                    section.data[offset],
                    section.data[offset + 1],
                ]));
            }

            sections.push(section);
        }

        match program_key {
            None => Err(PlanError::MissingProgramKey),
            Some(PROGRAM_KEY) => Ok(Self { sections }),
            Some(key) => Err(PlanError::WrongProgramKey(key)),
        }
    }

    pub(crate) fn sections(&self) -> &[DeliverySection] {
        &self.sections
    }

    /// Write commands in delivery order.
    pub(crate) fn writes(&self) -> impl Iterator<Item = BlockWrite<'_>> {
        self.sections.iter().flat_map(|section| {
            section
                .data
                .chunks(MAX_BLOCKS_PER_WRITE * BLOCK_SIZE)
                .enumerate()
                .map(move |(i, data)| BlockWrite {
                    block: section.initial_block + (i * MAX_BLOCKS_PER_WRITE) as u8,
                    data,
                })
        })
    }
}

fn section(address: u32, data: Vec<u8>) -> Result<DeliverySection, PlanError> {
    if address % BLOCK_SIZE as u32 != 0 {
        return Err(PlanError::Misaligned(address));
    }
    if address < BASE_ADDRESS {
        return Err(PlanError::BeforeBase(address));
    }
    if data.len() % BLOCK_SIZE != 0 || address as usize + data.len() > END_ADDRESS as usize {
        return Err(PlanError::BadLength {
            address,
            len: data.len(),
        });
    }

    // Fits in a byte since the memory ends at END_ADDRESS
    let initial_block = ((address - BASE_ADDRESS) / BLOCK_SIZE as u32) as u8;

    Ok(DeliverySection {
        initial_block,
        data,
    })
}
