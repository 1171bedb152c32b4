//! The custom ISO15693 command: take one sample and return it in the reply.
//!
//! The ROM stack calls the handler from its own (interrupt) context once the request frame has
//! been received. The handler runs a free running conversion, waits a fixed settle time and
//! writes the reply straight into the transmit FIFO:
//!
//! | Byte | Content |
//! |------|---------|
//! | 0 | response flags, `0x00` |
//! | 1..3 | raw result, little endian |
//!
//! Completion of the conversion is never confirmed. If the settle time is shorter than
//! [`conversion_time_us`](crate::config::conversion_time_us) of the polled settings, the reply
//! carries whatever result the converter still holds.
//!
//! The ROM calls table entries without arguments, so a board wraps the handler in an
//! `extern "C" fn()` that reaches its context through a static:
//!
//! ```ignore
//! static CONTEXT: SharedCommandContext<Sd14, Rf13m, Delay> = shared_command_context();
//!
//! extern "C" fn sample_command() {
//!     handle_command(&CONTEXT);
//! }
//!
//! #[link_section = ".driver_table"]
//! static DRIVER_TABLE: RomDriverTable<1> = driver_table(sample_command);
//! ```

use crate::{
    acquisition::SharedSampler,
    converter::{ChannelSelector, Converter, ConverterRegisters, ConverterSettings},
    dispatch::CUSTOM_COMMAND_ID,
    rf::RfRegisters,
    sampling::SampleState,
    Error,
};
use core::cell::RefCell;
use embassy_sync::blocking_mutex::CriticalSectionMutex;
use embedded_hal::delay::DelayNs;
use log::{debug, warn};

/// Response flags of a successful reply.
pub const REPLY_OK: u8 = 0x00;

/// Response flags of an error reply, followed by an error code.
pub const REPLY_ERROR: u8 = 0x01;

/// ISO15693 error code "error with no information given".
pub const ERROR_NO_INFORMATION: u8 = 0x0F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CustomCommandConfig {
    pub command_id: u16,

    /// Busy wait between starting the converter and reading the result.
    ///
    /// 500 µs is 1000 MCLK cycles at 2 MHz, enough for a conversion with the polled settings.
    /// Readers still issue the command twice and keep the second reply.
    pub settle_time_us: u32,

    pub channel: ChannelSelector,
    pub settings: ConverterSettings,
}

impl CustomCommandConfig {
    pub const fn new() -> Self {
        Self {
            command_id: CUSTOM_COMMAND_ID,
            settle_time_us: 500,
            channel: ChannelSelector::ReferenceAdc1,
            settings: ConverterSettings::polled(),
        }
    }
}

impl Default for CustomCommandConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Samples `config.channel` and transmits the reply, returning the raw value sent.
pub fn acquire_and_reply<R, T, D>(
    converter: &mut Converter<R>,
    rf: &mut T,
    delay: &mut D,
    config: &CustomCommandConfig,
) -> u16
where
    R: ConverterRegisters,
    T: RfRegisters,
    D: DelayNs,
{
    converter.start_polled(&config.settings, config.channel);
    delay.delay_us(config.settle_time_us);
    let value = converter.read_result();
    converter.disable();

    rf.transmit_u8(REPLY_OK);
    rf.transmit_u16(value);

    debug!("Custom command replied with {}", value);
    value
}

/// Everything the custom command handler needs, owned by whoever the ROM calls into.
pub struct CommandContext<'a, R, T, D> {
    pub sampler: &'a SharedSampler<R>,
    pub rf: T,
    pub delay: D,
    pub config: CustomCommandConfig,
}

impl<'a, R, T, D> CommandContext<'a, R, T, D>
where
    R: ConverterRegisters,
    T: RfRegisters,
    D: DelayNs,
{
    pub fn new(sampler: &'a SharedSampler<R>, rf: T, delay: D) -> Self {
        Self {
            sampler,
            rf,
            delay,
            config: CustomCommandConfig::default(),
        }
    }

    /// Replies with a sample, or with an error while a sampling cycle owns the converter.
    pub fn sample(&mut self) -> Result<u16, Error> {
        let Self {
            sampler,
            rf,
            delay,
            config,
        } = self;

        sampler.lock(|sampler| {
            let mut sampler = sampler.borrow_mut();

            match sampler.state() {
                SampleState::Idle => Ok(acquire_and_reply(
                    sampler.converter_mut(),
                    rf,
                    delay,
                    config,
                )),
                state => {
                    rf.transmit_u8(REPLY_ERROR);
                    rf.transmit_u8(ERROR_NO_INFORMATION);
                    Err(Error::CycleInProgress(state))
                }
            }
        })
    }
}

/// Handler registered in the dispatch table under [`CustomCommandConfig::command_id`].
pub fn custom_command_handler<R, T, D>(context: &mut CommandContext<'_, R, T, D>)
where
    R: ConverterRegisters,
    T: RfRegisters,
    D: DelayNs,
{
    if let Err(e) = context.sample() {
        warn!("Custom command rejected: {}", e);
    }
}

/// Context of the handler as reached from the ROM, filled in once the board is brought up.
pub type SharedCommandContext<R, T, D> =
    CriticalSectionMutex<RefCell<Option<CommandContext<'static, R, T, D>>>>;

pub const fn shared_command_context<R, T, D>() -> SharedCommandContext<R, T, D> {
    CriticalSectionMutex::new(RefCell::new(None))
}

/// Body of the argument-less function placed in the driver table.
pub fn handle_command<R, T, D>(context: &SharedCommandContext<R, T, D>)
where
    R: ConverterRegisters,
    T: RfRegisters,
    D: DelayNs,
{
    context.lock(|context| match context.borrow_mut().as_mut() {
        Some(context) => custom_command_handler(context),
        None => warn!("Custom command received before bring-up"),
    })
}
