//! Fixed locations in FRAM and RAM dictated by the ROM stack.

use core::ops::Range;

/// ISO15693 block lock area. A zero bit marks a locked block.
pub const LOCK_BLOCKS_ADDRESS: u16 = 0xF840;
pub const LOCK_BLOCKS_SIZE: usize = 38;

/// Firmware system control byte, read by the ROM at boot.
pub const FIRMWARE_CONTROL_ADDRESS: u16 = 0xF867;

/// Start of the NDEF image, which is also block 0 of the tag memory.
pub const NDEF_ADDRESS: u16 = 0xF868;

/// A variable owned by the ROM stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RomVariable {
    pub name: &'static str,
    pub address: u16,
    pub size: u16,
}

pub const ROM_VARIABLES: [RomVariable; 6] = [
    RomVariable { name: "DS", address: 0x1C00, size: 1 },
    RomVariable { name: "PF", address: 0x1C0A, size: 96 },
    RomVariable { name: "RF", address: 0x1C6A, size: 1 },
    RomVariable { name: "NRX", address: 0x1CA4, size: 34 },
    RomVariable { name: "NTX", address: 0x1CC6, size: 33 },
    RomVariable { name: "EL", address: 0x1CF2, size: 1 },
];

/// RAM that must be kept free of firmware data.
pub fn rom_reserved_ram() -> Range<u16> {
    let start = ROM_VARIABLES.iter().map(|v| v.address).min().unwrap_or(0);
    let end = ROM_VARIABLES
        .iter()
        .map(|v| v.address + v.size)
        .max()
        .unwrap_or(0);
    start..end
}

/// Unlocks every block.
pub fn clear_block_locks(area: &mut [u8]) {
    area.fill(0xFF);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlockSize {
    FourBytes,
    EightBytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IsoPage {
    First,
    Second,
}

/// The firmware system control byte.
///
/// | Bit | Meaning |
/// |-----|---------|
/// | 0 | block size, set for 8 byte blocks |
/// | 1 | ISO page, set for the first page (4 byte blocks only) |
/// | 2 | ROM eUSCI support |
/// | 6 | NFC bridge disable |
/// | 7 | ROM sensor support |
///
/// The NFC bridge must stay disabled: its registers overlap the NDEF image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareControl {
    pub block_size: BlockSize,
    pub page: IsoPage,
    pub rom_eusci_support: bool,
    pub nfc_bridge_disabled: bool,
    pub rom_sensor_support: bool,
}

impl FirmwareControl {
    const EIGHT_BYTE_BLOCK: u8 = 1 << 0;
    const FIRST_ISO_PAGE: u8 = 1 << 1;
    const ROM_EUSCI_SUPPORT: u8 = 1 << 2;
    const NFC_BRIDGE_DISABLED: u8 = 1 << 6;
    const ROM_SENSOR_SUPPORT: u8 = 1 << 7;

    /// Four byte blocks on the first page, NFC bridge and ROM drivers off.
    pub const fn nfc_only() -> Self {
        Self {
            block_size: BlockSize::FourBytes,
            page: IsoPage::First,
            rom_eusci_support: false,
            nfc_bridge_disabled: true,
            rom_sensor_support: false,
        }
    }

    pub const fn bits(&self) -> u8 {
        let mut bits = 0;
        if matches!(self.block_size, BlockSize::EightBytes) {
            bits |= Self::EIGHT_BYTE_BLOCK;
        }
        if matches!(self.page, IsoPage::First) {
            bits |= Self::FIRST_ISO_PAGE;
        }
        if self.rom_eusci_support {
            bits |= Self::ROM_EUSCI_SUPPORT;
        }
        if self.nfc_bridge_disabled {
            bits |= Self::NFC_BRIDGE_DISABLED;
        }
        if self.rom_sensor_support {
            bits |= Self::ROM_SENSOR_SUPPORT;
        }
        bits
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self {
            block_size: if bits & Self::EIGHT_BYTE_BLOCK != 0 {
                BlockSize::EightBytes
            } else {
                BlockSize::FourBytes
            },
            page: if bits & Self::FIRST_ISO_PAGE != 0 {
                IsoPage::First
            } else {
                IsoPage::Second
            },
            rom_eusci_support: bits & Self::ROM_EUSCI_SUPPORT != 0,
            nfc_bridge_disabled: bits & Self::NFC_BRIDGE_DISABLED != 0,
            rom_sensor_support: bits & Self::ROM_SENSOR_SUPPORT != 0,
        }
    }

    pub const fn block_size_bytes(&self) -> usize {
        match self.block_size {
            BlockSize::FourBytes => 4,
            BlockSize::EightBytes => 8,
        }
    }
}

impl Default for FirmwareControl {
    fn default() -> Self {
        Self::nfc_only()
    }
}
