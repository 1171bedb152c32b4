//! Simulated peripherals for running the firmware logic on a host.
//!
//! Each simulation records what was written to it so tests can assert on register level
//! behaviour. Hardware events (conversion complete, overflow) are injected by the test.

use crate::{
    acquisition::LowPowerMode,
    converter::{ChannelSelector, ConverterRegisters},
    registers::{
        Ctl0, Ctl1, InterruptVector, RfControl, RfInterrupts, SD14CTL0, SD14CTL1, SD14IV,
    },
    rf::{RfRegisters, RomStack},
};
use embedded_hal::delay::DelayNs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterWrite {
    Ctl0(u16),
    Ctl1(u16),
}

#[derive(Debug, Default)]
pub struct SimConverter {
    ctl0: u16,
    ctl1: u16,
    mem0: u16,
    writes: Vec<RegisterWrite>,
    conversions: Vec<ChannelSelector>,
}

impl SimConverter {
    pub const fn new() -> Self {
        Self {
            ctl0: 0,
            ctl1: 0,
            mem0: 0,
            writes: Vec::new(),
            conversions: Vec::new(),
        }
    }

    /// Finishes the running conversion with `value`, raising the result flag.
    pub fn complete(&mut self, value: u16) {
        self.mem0 = value;
        self.set_flag(SD14CTL0::IFG::SET);
    }

    /// Raises the overflow flag, as if a result was overwritten before it was read.
    pub fn overflow(&mut self) {
        self.set_flag(SD14CTL0::OVIFG::SET);
    }

    pub fn writes(&self) -> &[RegisterWrite] {
        &self.writes
    }

    /// Channels of all conversions started so far, oldest first.
    pub fn conversions(&self) -> &[ChannelSelector] {
        &self.conversions
    }

    pub fn clear_history(&mut self) {
        self.writes.clear();
        self.conversions.clear();
    }

    fn set_flag(&mut self, flag: tock_registers::fields::FieldValue<u16, SD14CTL0::Register>) {
        let mut ctl0 = Ctl0::new(self.ctl0);
        ctl0.modify(flag);
        self.ctl0 = ctl0.get();
    }
}

impl ConverterRegisters for SimConverter {
    fn ctl0(&self) -> Ctl0 {
        Ctl0::new(self.ctl0)
    }

    fn set_ctl0(&mut self, value: Ctl0) {
        let previous = Ctl0::new(self.ctl0);

        if value.is_set(SD14CTL0::EN)
            && value.is_set(SD14CTL0::SC)
            && !previous.is_set(SD14CTL0::SC)
        {
            if let Some(channel) =
                ChannelSelector::from_repr(Ctl1::new(self.ctl1).read(SD14CTL1::INCH))
            {
                self.conversions.push(channel);
            }
        }

        self.ctl0 = value.get();
        self.writes.push(RegisterWrite::Ctl0(self.ctl0));
    }

    fn ctl1(&self) -> Ctl1 {
        Ctl1::new(self.ctl1)
    }

    fn set_ctl1(&mut self, value: Ctl1) {
        self.ctl1 = value.get();
        self.writes.push(RegisterWrite::Ctl1(self.ctl1));
    }

    fn interrupt_vector(&mut self) -> InterruptVector {
        let ctl0 = Ctl0::new(self.ctl0);

        let mut vector = InterruptVector::new(0);
        if ctl0.is_set(SD14CTL0::OVIFG) {
            vector.modify(SD14IV::CAUSE::Overflow);
        } else if ctl0.is_set(SD14CTL0::IFG) {
            vector.modify(SD14IV::CAUSE::Result);
        }
        vector
    }

    fn result(&self) -> u16 {
        self.mem0
    }
}

#[derive(Debug, Default)]
pub struct SimRf {
    control: u16,
    interrupts: u16,
    transmitted: Vec<u8>,
}

impl SimRf {
    /// Bytes pushed into the transmit FIFO, in transmission order.
    pub fn transmitted(&self) -> &[u8] {
        &self.transmitted
    }
}

impl RfRegisters for SimRf {
    fn control(&self) -> RfControl {
        RfControl::new(self.control)
    }

    fn set_control(&mut self, value: RfControl) {
        self.control = value.get();
    }

    fn interrupts(&self) -> RfInterrupts {
        RfInterrupts::new(self.interrupts)
    }

    fn set_interrupts(&mut self, value: RfInterrupts) {
        self.interrupts = value.get();
    }

    fn transmit_u8(&mut self, value: u8) {
        self.transmitted.push(value);
    }

    fn transmit_u16(&mut self, value: u16) {
        self.transmitted.extend_from_slice(&value.to_le_bytes());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RomCall {
    DriverState(u8),
    InitFunctionPointers,
    CheckPartConfiguration,
}

#[derive(Debug, Default)]
pub struct SimRom {
    calls: Vec<RomCall>,
}

impl SimRom {
    pub fn calls(&self) -> &[RomCall] {
        &self.calls
    }
}

impl RomStack for SimRom {
    fn set_driver_state(&mut self, value: u8) {
        self.calls.push(RomCall::DriverState(value));
    }

    fn init_function_pointers(&mut self) {
        self.calls.push(RomCall::InitFunctionPointers);
    }

    fn check_part_configuration(&mut self) {
        self.calls.push(RomCall::CheckPartConfiguration);
    }
}

/// Busy wait that only accumulates the requested time.
#[derive(Debug, Default)]
pub struct SimDelay {
    elapsed_ns: u64,
}

impl SimDelay {
    pub fn elapsed_ns(&self) -> u64 {
        self.elapsed_ns
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
    }
}

/// Low power mode whose "interrupts" are a scripted closure, run once per sleep.
pub struct SimLowPower<F> {
    on_sleep: F,
    sleeps: usize,
    max_sleeps: usize,
}

impl<F: FnMut()> SimLowPower<F> {
    /// Panics on sleep number `max_sleeps + 1`, which would never be woken.
    pub fn new(max_sleeps: usize, on_sleep: F) -> Self {
        Self {
            on_sleep,
            sleeps: 0,
            max_sleeps,
        }
    }

    pub fn sleeps(&self) -> usize {
        self.sleeps
    }
}

impl<F: FnMut()> LowPowerMode for SimLowPower<F> {
    fn sleep_until<T>(&mut self, mut poll: impl FnMut() -> Option<T>) -> T {
        loop {
            if let Some(value) = poll() {
                return value;
            }

            if self.sleeps == self.max_sleeps {
                panic!("Sleeping with nothing left to wake up after {} sleeps", self.sleeps);
            }
            self.sleeps += 1;
            (self.on_sleep)();
        }
    }
}
