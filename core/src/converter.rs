//! Control of the shared SD14 sigma-delta converter.

use crate::registers::{Ctl0, Ctl1, InterruptVector, SD14CTL0, SD14CTL1, SD14IV};
use log::trace;
use strum::{EnumIter, FromRepr, IntoStaticStr};
use tock_registers::fields::FieldValue;

/// Access to the converter registers.
///
/// Implemented over the memory mapped SD14 block on the target and by
/// [`SimConverter`](crate::sim::SimConverter) on the host.
pub trait ConverterRegisters {
    fn ctl0(&self) -> Ctl0;
    fn set_ctl0(&mut self, value: Ctl0);

    fn ctl1(&self) -> Ctl1;
    fn set_ctl1(&mut self, value: Ctl1);

    /// Reads `SD14IV`.
    fn interrupt_vector(&mut self) -> InterruptVector;

    /// Reads `SD14MEM0`.
    fn result(&self) -> u16;
}

/// Converter input channels, numbered as in the `INCH` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, FromRepr, IntoStaticStr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum ChannelSelector {
    Adc0 = 0,
    InternalTemperature = 1,
    ThermistorAdc2 = 2,
    ReferenceAdc1 = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Gain {
    X1 = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
}

/// Number of CIC filter outputs discarded before a result is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum InterruptDelay {
    FirstSample = 0,
    SecondSample = 1,
    ThirdSample = 2,
    FourthSample = 3,
}

/// Divider applied to ACLK to produce the sampling clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum ClockDivider {
    By1 = 0,
    By16 = 1,
    By32 = 2,
    By64 = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConversionMode {
    Single,
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ground {
    /// SVSS, 0.125 V
    Svss,
    Virtual,
}

/// Fixed converter configuration, everything except the input channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConverterSettings {
    pub gain: Gain,
    pub interrupt_delay: InterruptDelay,
    pub clock_divider: ClockDivider,
    pub mode: ConversionMode,
    pub ground: Ground,
    pub unipolar: bool,
    pub bias_current: bool,
    pub result_interrupt: bool,
}

impl ConverterSettings {
    /// Interrupt driven single conversions.
    ///
    /// ACLK runs from the 64 kHz VLO, divided by 32 this gives the 2 kHz sampling clock. The CIC
    /// filter needs two consecutive samples before its output settles, hence the interrupt delay.
    pub const fn sampling() -> Self {
        Self {
            gain: Gain::X2,
            interrupt_delay: InterruptDelay::SecondSample,
            clock_divider: ClockDivider::By32,
            mode: ConversionMode::Single,
            ground: Ground::Svss,
            unipolar: true,
            bias_current: true,
            result_interrupt: true,
        }
    }

    /// Free running conversions read back after a fixed delay, no interrupts.
    pub const fn polled() -> Self {
        Self {
            gain: Gain::X2,
            interrupt_delay: InterruptDelay::FirstSample,
            clock_divider: ClockDivider::By1,
            mode: ConversionMode::Continuous,
            ground: Ground::Virtual,
            unipolar: true,
            bias_current: true,
            result_interrupt: false,
        }
    }

    pub fn ctl0(&self) -> Ctl0 {
        let mut ctl0 = Ctl0::new(0);
        ctl0.modify(SD14CTL0::DIV.val(self.clock_divider as u16) + SD14CTL0::SSEL::Aclk);

        if self.result_interrupt {
            ctl0.modify(SD14CTL0::IE::SET);
        }
        if self.mode == ConversionMode::Single {
            ctl0.modify(SD14CTL0::SGL::SET);
        }
        if self.ground == Ground::Virtual {
            ctl0.modify(SD14CTL0::VIRTGND::SET);
        }

        ctl0
    }

    pub fn ctl1(&self, channel: ChannelSelector) -> Ctl1 {
        let mut ctl1 = Ctl1::new(0);
        ctl1.modify(
            SD14CTL1::INCH.val(channel as u16)
                + SD14CTL1::RATE.val(0)
                + SD14CTL1::GAIN.val(self.gain as u16)
                + SD14CTL1::INTDLY.val(self.interrupt_delay as u16),
        );

        if self.unipolar {
            ctl1.modify(SD14CTL1::UNI::SET);
        }
        if self.bias_current {
            ctl1.modify(SD14CTL1::RBEN::Both);
        }

        ctl1
    }
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self::sampling()
    }
}

/// Decoded `SD14IV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptCause {
    NotPending,
    Overflow,
    Result,
}

impl From<InterruptVector> for InterruptCause {
    fn from(vector: InterruptVector) -> Self {
        use SD14IV::CAUSE::Value;
        match vector.read_as_enum(SD14IV::CAUSE) {
            Some(Value::Overflow) => Self::Overflow,
            Some(Value::Result) => Self::Result,
            Some(Value::NotPending) | None => Self::NotPending,
        }
    }
}

pub struct Converter<R> {
    registers: R,
    settings: ConverterSettings,
}

impl<R: ConverterRegisters> Converter<R> {
    pub const fn new(registers: R) -> Self {
        Self::with_settings(registers, ConverterSettings::sampling())
    }

    pub const fn with_settings(registers: R, settings: ConverterSettings) -> Self {
        Self {
            registers,
            settings,
        }
    }

    pub fn settings(&self) -> &ConverterSettings {
        &self.settings
    }

    pub fn registers(&self) -> &R {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.registers
    }

    /// Configures a single conversion of `channel` and starts it.
    ///
    /// Completion is reported through the result interrupt. The caller must not start a
    /// conversion while another one is outstanding.
    pub fn configure_and_start(&mut self, channel: ChannelSelector) {
        let name: &'static str = channel.into();
        trace!("Starting conversion of {}", name);

        self.registers.set_ctl1(self.settings.ctl1(channel));
        self.registers.set_ctl0(self.settings.ctl0());

        self.modify_ctl0(SD14CTL0::EN::SET);
        self.modify_ctl0(SD14CTL0::SC::SET);
    }

    /// Starts free running conversions using `settings` instead of the configured ones.
    ///
    /// The converter is enabled and started before the channel is written, so the very first
    /// conversion may still use the previously selected input.
    pub fn start_polled(&mut self, settings: &ConverterSettings, channel: ChannelSelector) {
        let name: &'static str = channel.into();
        trace!("Starting polled conversions of {}", name);

        let mut ctl0 = settings.ctl0();
        ctl0.modify(SD14CTL0::EN::SET);
        self.registers.set_ctl0(ctl0);
        self.modify_ctl0(SD14CTL0::SC::SET);

        self.registers.set_ctl1(settings.ctl1(channel));
    }

    pub fn disable(&mut self) {
        trace!("Disabling converter");
        self.modify_ctl0(SD14CTL0::EN::CLEAR);
    }

    pub fn pending(&mut self) -> InterruptCause {
        self.registers.interrupt_vector().into()
    }

    pub fn acknowledge_result(&mut self) {
        self.modify_ctl0(SD14CTL0::IFG::CLEAR);
    }

    pub fn acknowledge_overflow(&mut self) {
        self.modify_ctl0(SD14CTL0::OVIFG::CLEAR);
    }

    pub fn read_result(&self) -> u16 {
        self.registers.result()
    }

    pub fn is_enabled(&self) -> bool {
        self.registers.ctl0().is_set(SD14CTL0::EN)
    }

    /// The channel currently selected by `SD14CTL1`.
    pub fn channel(&self) -> Option<ChannelSelector> {
        ChannelSelector::from_repr(self.registers.ctl1().read(SD14CTL1::INCH))
    }

    fn modify_ctl0(&mut self, field: FieldValue<u16, SD14CTL0::Register>) {
        let mut ctl0 = self.registers.ctl0();
        ctl0.modify(field);
        self.registers.set_ctl0(ctl0);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::SimConverter;
    use strum::IntoEnumIterator;

    #[test]
    fn sampling_register_values() {
        let settings = ConverterSettings::sampling();

        assert_eq!(settings.ctl0().get(), 0x0054);
        assert_eq!(settings.ctl1(ChannelSelector::ReferenceAdc1).get(), 0xD143);
        assert_eq!(settings.ctl1(ChannelSelector::ThermistorAdc2).get(), 0xD142);
    }

    #[test]
    fn polled_register_values() {
        let settings = ConverterSettings::polled();

        assert_eq!(settings.ctl0().get(), 0x0200);
        assert_eq!(settings.ctl1(ChannelSelector::ReferenceAdc1).get(), 0xD043);
    }

    #[test]
    fn configure_and_start_every_channel() {
        for previous in ChannelSelector::iter() {
            for channel in ChannelSelector::iter() {
                let mut converter = Converter::new(SimConverter::default());
                converter.configure_and_start(previous);
                converter.configure_and_start(channel);

                let ctl0 = converter.registers().ctl0();
                assert!(ctl0.is_set(SD14CTL0::EN));
                assert!(ctl0.is_set(SD14CTL0::SC));
                assert!(ctl0.is_set(SD14CTL0::IE));
                assert!(ctl0.is_set(SD14CTL0::SGL));
                assert_eq!(ctl0.read(SD14CTL0::DIV), ClockDivider::By32 as u16);

                let ctl1 = converter.registers().ctl1();
                assert_eq!(ctl1.read(SD14CTL1::GAIN), Gain::X2 as u16);
                assert_eq!(
                    ctl1.read(SD14CTL1::INTDLY),
                    InterruptDelay::SecondSample as u16
                );
                assert_eq!(ctl1.read(SD14CTL1::RBEN), 3);
                assert!(ctl1.is_set(SD14CTL1::UNI));

                assert_eq!(converter.channel(), Some(channel));
                assert!(converter.is_enabled());
            }
        }
    }

    #[test]
    fn configure_writes_channel_before_enabling() {
        let mut converter = Converter::new(SimConverter::default());
        converter.configure_and_start(ChannelSelector::ThermistorAdc2);

        assert_eq!(
            converter.registers().writes(),
            &[
                crate::sim::RegisterWrite::Ctl1(0xD142),
                crate::sim::RegisterWrite::Ctl0(0x0054),
                crate::sim::RegisterWrite::Ctl0(0x0454),
                crate::sim::RegisterWrite::Ctl0(0x0C54),
            ]
        );
        assert_eq!(
            converter.registers().conversions(),
            &[ChannelSelector::ThermistorAdc2]
        );
    }

    #[test]
    fn acknowledge_clears_only_the_flag() {
        let mut converter = Converter::new(SimConverter::default());
        converter.configure_and_start(ChannelSelector::ReferenceAdc1);

        converter.registers_mut().overflow();
        assert_eq!(converter.pending(), InterruptCause::Overflow);
        converter.acknowledge_overflow();
        assert_eq!(converter.pending(), InterruptCause::NotPending);

        converter.registers_mut().complete(1234);
        assert_eq!(converter.pending(), InterruptCause::Result);
        converter.acknowledge_result();
        assert_eq!(converter.pending(), InterruptCause::NotPending);

        assert!(converter.is_enabled());
        assert_eq!(converter.read_result(), 1234);
    }

    #[test]
    fn disable() {
        let mut converter = Converter::new(SimConverter::default());
        converter.configure_and_start(ChannelSelector::Adc0);
        converter.disable();

        assert!(!converter.is_enabled());
        assert_eq!(converter.channel(), Some(ChannelSelector::Adc0));
    }
}
