//! Bring-up of the ROM resident ISO15693 stack.
//!
//! The stack itself (framing, anticollision, CRC, block access) lives in ROM and is only ever
//! called through its fixed entry points. What remains for the firmware is to initialise the
//! ROM's state, enable the RF13M front end and optionally reset the block lock area.

use crate::{
    dispatch::RomDriverTable,
    memory,
    registers::{RfControl, RfInterrupts, RF13MCTL, RF13MINT},
    Error,
};
use log::{debug, info};

/// Access to the RF13M front end registers.
pub trait RfRegisters {
    fn control(&self) -> RfControl;
    fn set_control(&mut self, value: RfControl);

    fn interrupts(&self) -> RfInterrupts;
    fn set_interrupts(&mut self, value: RfInterrupts);

    /// Writes the low byte of `RF13MTXF`.
    fn transmit_u8(&mut self, value: u8);

    /// Writes the full word of `RF13MTXF`.
    fn transmit_u16(&mut self, value: u16);
}

/// Fixed entry points of the ROM code.
pub trait RomStack {
    /// Writes the ROM's `DS` variable.
    fn set_driver_state(&mut self, value: u8);

    /// ROM routine at `0x5CDA`.
    fn init_function_pointers(&mut self);

    /// ROM routine at `0x5CAC`.
    fn check_part_configuration(&mut self);
}

pub const ROM_INIT_FUNCTION_POINTERS: u16 = 0x5CDA;
pub const ROM_CHECK_PART_CONFIGURATION: u16 = 0x5CAC;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Iso15693Config {
    /// Unlock every block at start up.
    pub clear_block_locks: bool,
}

impl Default for Iso15693Config {
    fn default() -> Self {
        Self {
            clear_block_locks: true,
        }
    }
}

/// Prepares the ROM stack and the RF front end.
///
/// `lock_blocks` is the FRAM lock block area, see [`memory::LOCK_BLOCKS_ADDRESS`]. The ROM is
/// left untouched if `driver_table` would not be usable by it.
pub fn bring_up<ROM: RomStack, RF: RfRegisters, const N: usize>(
    rom: &mut ROM,
    rf: &mut RF,
    lock_blocks: &mut [u8],
    driver_table: &RomDriverTable<N>,
    config: &Iso15693Config,
) -> Result<(), Error> {
    let table = driver_table.validate()?;
    debug!("Driver table holds {} entries", table.len());

    rom.set_driver_state(1);
    rom.init_function_pointers();
    rom.check_part_configuration();
    debug!("ROM stack initialised");

    let mut control = rf.control();
    control.modify(RF13MCTL::TXEN::SET + RF13MCTL::RXEN::SET + RF13MCTL::RFTOEN::SET);
    rf.set_control(control);

    let mut interrupts = rf.interrupts();
    interrupts.modify(RF13MINT::RXIE::SET + RF13MINT::RFTOIE::SET);
    rf.set_interrupts(interrupts);

    if config.clear_block_locks {
        memory::clear_block_locks(lock_blocks);
        info!("Cleared {} bytes of block locks", lock_blocks.len());
    }

    Ok(())
}
