//! Sensor side logic for a battery-less, NFC powered RF430FRL152H thermometer.
//!
//! The ROM resident ISO15693 stack handles everything on the air interface. This crate provides
//! what sits around it: control of the SD14 sigma-delta converter, the interrupt driven two phase
//! (reference resistor, then thermistor) sampling state machine, the driver table that lets the
//! ROM stack call a custom command handler, and the static tag memory image.
//!
//! Hardware access goes through the traits in [`converter`] and [`rf`], so boards provide memory
//! mapped implementations and tests use the simulated peripherals in [`sim`].

#![cfg_attr(not(feature = "std"), no_std)]

pub mod acquisition;
pub mod config;
pub mod converter;
pub mod custom_command;
pub mod dispatch;
pub mod mailbox;
pub mod memory;
pub mod ndef;
pub mod registers;
pub mod rf;
pub mod sampling;

#[cfg(any(test, feature = "sim"))]
pub mod sim;


use crate::sampling::SampleState;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    #[error("A sampling cycle is already in progress (state {0:?})")]
    CycleInProgress(SampleState),

    #[error("Command ID {0:#06x} is outside the custom command range")]
    CommandIdOutOfRange(u16),

    #[error("Command ID {0:#06x} is registered more than once")]
    DuplicateCommandId(u16),

    #[error("The dispatch table has no free slots")]
    TableFull,

    #[error("The dispatch table has no entries")]
    EmptyTable,

    #[error("No handler is registered for command ID {0:#06x}")]
    UnknownCommand(u16),

    #[error("The driver table does not begin with the start key")]
    MissingStartKey,

    #[error("The driver table is not terminated by the end key")]
    UnterminatedTable,

    #[error("The output buffer is too small for the image")]
    ImageTooSmall,

    #[error("The tag image does not hold a URI record")]
    MalformedImage,
}
