//! Build time configuration of the sensor.

use crate::{
    converter::{ClockDivider, ConverterSettings},
    custom_command::CustomCommandConfig,
    dispatch::COMMAND_ID_RANGE,
    memory::FirmwareControl,
    rf::Iso15693Config,
};

pub const FIRMWARE_CONTROL: FirmwareControl = FirmwareControl::nfc_only();

pub const ISO15693: Iso15693Config = Iso15693Config {
    clear_block_locks: true,
};

pub const SAMPLING: ConverterSettings = ConverterSettings::sampling();

pub const CUSTOM_COMMAND: CustomCommandConfig = CustomCommandConfig::new();

/// Upper bound on handlers in the driver table.
pub const MAX_CUSTOM_COMMANDS: usize = 4;

pub(crate) mod bounds {
    /// MCLK while powered from the reader field.
    pub(crate) const MCLK_HZ: u32 = 2_000_000;

    /// ACLK, the VLO divided by 4.
    pub(crate) const ACLK_HZ: u32 = 64_000;

    /// Sampling clock periods per CIC filter output.
    pub(crate) const PERIODS_PER_OUTPUT: u32 = 2;
}

/// Worst case time from starting a conversion with `settings` until its result is valid.
///
/// The sampling clock is ACLK divided by the clock divider, and one filter output is produced
/// every [`bounds::PERIODS_PER_OUTPUT`] periods. The outputs skipped by the interrupt delay
/// come on top of the one that is reported.
pub const fn conversion_time_us(settings: &ConverterSettings) -> u32 {
    let divider = match settings.clock_divider {
        ClockDivider::By1 => 1,
        ClockDivider::By16 => 16,
        ClockDivider::By32 => 32,
        ClockDivider::By64 => 64,
    };
    let outputs = settings.interrupt_delay as u32 + 1;
    let periods = outputs * bounds::PERIODS_PER_OUTPUT;

    (periods * divider * 1_000_000).div_ceil(bounds::ACLK_HZ)
}

/// Busy wait in MCLK cycles for `us` microseconds.
pub const fn settle_cycles(us: u32) -> u32 {
    us * (bounds::MCLK_HZ / 1_000_000)
}

const _: () = assert!(
    CUSTOM_COMMAND.command_id >= *COMMAND_ID_RANGE.start()
        && CUSTOM_COMMAND.command_id <= *COMMAND_ID_RANGE.end()
);
