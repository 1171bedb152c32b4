//! Glue between the converter interrupt and the main flow.
//!
//! The sampler is shared between the two contexts through a critical section mutex. The
//! interrupt handler calls [`on_converter_interrupt`] and wakes the main flow when it returns
//! `true`; the main flow calls [`acquire`], which sleeps until the cycle it started has finished.

use crate::{
    converter::ConverterRegisters,
    mailbox::Mailbox,
    sampling::{Sampler, SamplerEvent, SamplesBuffer},
    Error,
};
use core::cell::RefCell;
use embassy_sync::blocking_mutex::CriticalSectionMutex;
use log::{info, warn};

pub type SharedSampler<R> = CriticalSectionMutex<RefCell<Sampler<R>>>;

pub const fn shared_sampler<R: ConverterRegisters>(sampler: Sampler<R>) -> SharedSampler<R> {
    CriticalSectionMutex::new(RefCell::new(sampler))
}

/// Entry point for the converter interrupt.
///
/// Returns `true` if the main flow should leave low power mode on return from the interrupt.
pub fn on_converter_interrupt<R: ConverterRegisters>(
    sampler: &SharedSampler<R>,
    mailbox: &Mailbox,
) -> bool {
    let event = sampler.lock(|sampler| sampler.borrow_mut().on_interrupt());

    match event {
        Some(event) => {
            mailbox.post(event);
            matches!(event, SamplerEvent::SampleReady(_))
        }
        None => false,
    }
}

/// Processor low power states.
pub trait LowPowerMode {
    /// Sleeps until `poll` yields a value.
    ///
    /// `poll` must be evaluated with interrupts masked and the sleep entered atomically with
    /// re-enabling them, otherwise a wake-up posted in between is lost.
    fn sleep_until<T>(&mut self, poll: impl FnMut() -> Option<T>) -> T;
}

/// Requests a cycle and empties the mailbox, so that only this cycle's results are taken.
///
/// Both happen under the sampler lock: the converter interrupt cannot post in between.
fn start_cycle<R: ConverterRegisters>(
    sampler: &SharedSampler<R>,
    mailbox: &Mailbox,
) -> Result<(), Error> {
    sampler.lock(|sampler| {
        sampler.borrow_mut().request_cycle()?;

        if mailbox.clear() {
            warn!("Discarded results of an earlier cycle");
        }
        Ok(())
    })
}

/// Runs one sampling cycle, sleeping while the converter works.
pub fn acquire<R: ConverterRegisters, P: LowPowerMode>(
    sampler: &SharedSampler<R>,
    mailbox: &Mailbox,
    power: &mut P,
) -> Result<SamplesBuffer, Error> {
    start_cycle(sampler, mailbox)?;

    let samples = power.sleep_until(|| mailbox.take_samples());
    info!(
        "Acquired reference {} thermistor {}",
        samples.reference(),
        samples.thermistor()
    );

    Ok(samples)
}

/// Runs one sampling cycle, waiting on the mailbox instead of a low power state.
pub async fn acquire_async<R: ConverterRegisters>(
    sampler: &SharedSampler<R>,
    mailbox: &Mailbox,
) -> Result<SamplesBuffer, Error> {
    start_cycle(sampler, mailbox)?;

    let samples = mailbox.wait_for_samples().await;
    info!(
        "Acquired reference {} thermistor {}",
        samples.reference(),
        samples.thermistor()
    );

    Ok(samples)
}
