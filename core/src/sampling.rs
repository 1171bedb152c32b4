//! Two phase temperature sampling.
//!
//! A cycle converts the reference resistor first and the thermistor second, driven entirely by
//! the converter's result interrupt:
//!
//! ```text
//! Idle --request_cycle--> AwaitingReference --result--> AwaitingThermistor --result--> Idle
//! ```
//!
//! The thermistor value is only meaningful relative to the reference taken in the same cycle, so
//! both slots are always published together.

use crate::{
    converter::{ChannelSelector, Converter, ConverterRegisters, InterruptCause},
    Error,
};
use log::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleState {
    Idle,
    AwaitingReference,
    AwaitingThermistor,
}

/// Raw results of one cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SamplesBuffer([u16; 2]);

impl SamplesBuffer {
    pub const fn new(reference: u16, thermistor: u16) -> Self {
        Self([reference, thermistor])
    }

    pub const fn reference(&self) -> u16 {
        self.0[0]
    }

    pub const fn thermistor(&self) -> u16 {
        self.0[1]
    }

    pub const fn slots(&self) -> [u16; 2] {
        self.0
    }

    /// Thermistor value corrected against the reference.
    ///
    /// No calibration data exists for the sensor yet, so this is the raw thermistor result.
    pub const fn compensated(&self) -> u16 {
        self.thermistor()
    }
}

/// What an interrupt produced for the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SamplerEvent {
    /// Both slots hold fresh results of the cycle that just finished.
    SampleReady(SamplesBuffer),

    /// A result was overwritten. The cycle keeps running.
    Overflow { state: SampleState },
}

/// The sampling state machine, owning the converter while a cycle runs.
pub struct Sampler<R> {
    converter: Converter<R>,
    state: SampleState,
    samples: SamplesBuffer,
}

impl<R: ConverterRegisters> Sampler<R> {
    pub const fn new(converter: Converter<R>) -> Self {
        Self {
            converter,
            state: SampleState::Idle,
            samples: SamplesBuffer::new(0, 0),
        }
    }

    pub fn state(&self) -> SampleState {
        self.state
    }

    /// Results of the last completed cycle, or partial results of the running one.
    pub fn samples(&self) -> SamplesBuffer {
        self.samples
    }

    pub fn converter(&self) -> &Converter<R> {
        &self.converter
    }

    pub fn converter_mut(&mut self) -> &mut Converter<R> {
        &mut self.converter
    }

    /// Starts a new cycle with the reference conversion.
    ///
    /// Rejected unless the sampler is idle, so the running cycle is never disturbed.
    pub fn request_cycle(&mut self) -> Result<(), Error> {
        if self.state != SampleState::Idle {
            return Err(Error::CycleInProgress(self.state));
        }

        debug!("Starting sampling cycle");
        self.converter
            .configure_and_start(ChannelSelector::ReferenceAdc1);
        self.state = SampleState::AwaitingReference;

        Ok(())
    }

    /// Handles one converter interrupt.
    ///
    /// Must be called from the converter interrupt (or with interrupts masked) since it reads and
    /// acknowledges the pending cause.
    pub fn on_interrupt(&mut self) -> Option<SamplerEvent> {
        match self.converter.pending() {
            InterruptCause::NotPending => None,
            InterruptCause::Overflow => {
                self.converter.acknowledge_overflow();
                warn!("Converter overflow in state {:?}", self.state);
                Some(SamplerEvent::Overflow { state: self.state })
            }
            InterruptCause::Result => {
                self.converter.acknowledge_result();
                self.on_result()
            }
        }
    }

    fn on_result(&mut self) -> Option<SamplerEvent> {
        let value = self.converter.read_result();

        match self.state {
            SampleState::AwaitingReference => {
                trace!("Reference result {}", value);
                self.samples.0[0] = value;

                self.converter
                    .configure_and_start(ChannelSelector::ThermistorAdc2);
                self.state = SampleState::AwaitingThermistor;
                None
            }
            SampleState::AwaitingThermistor => {
                trace!("Thermistor result {}", value);
                self.samples.0[1] = value;

                self.converter.disable();
                self.state = SampleState::Idle;
                debug!("Sampling cycle complete: {:?}", self.samples);
                Some(SamplerEvent::SampleReady(self.samples))
            }
            SampleState::Idle => {
                warn!("Ignoring result {} with no cycle running", value);
                None
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::SimConverter;

    fn sampler() -> Sampler<SimConverter> {
        Sampler::new(Converter::new(SimConverter::default()))
    }

    fn complete(sampler: &mut Sampler<SimConverter>, value: u16) -> Option<SamplerEvent> {
        sampler.converter_mut().registers_mut().complete(value);
        sampler.on_interrupt()
    }

    #[test]
    fn full_cycle() {
        let mut sampler = sampler();
        assert_eq!(sampler.state(), SampleState::Idle);

        sampler.request_cycle().unwrap();
        assert_eq!(sampler.state(), SampleState::AwaitingReference);
        assert_eq!(
            sampler.converter().channel(),
            Some(ChannelSelector::ReferenceAdc1)
        );

        assert_eq!(complete(&mut sampler, 1200), None);
        assert_eq!(sampler.state(), SampleState::AwaitingThermistor);
        assert_eq!(
            sampler.converter().channel(),
            Some(ChannelSelector::ThermistorAdc2)
        );
        assert!(sampler.converter().is_enabled());

        assert_eq!(
            complete(&mut sampler, 3400),
            Some(SamplerEvent::SampleReady(SamplesBuffer::new(1200, 3400)))
        );
        assert_eq!(sampler.state(), SampleState::Idle);
        assert!(!sampler.converter().is_enabled());

        assert_eq!(
            sampler.converter().registers().conversions(),
            &[ChannelSelector::ReferenceAdc1, ChannelSelector::ThermistorAdc2]
        );
    }

    #[test]
    fn request_rejected_while_running() {
        let mut sampler = sampler();
        sampler.request_cycle().unwrap();

        assert_eq!(
            sampler.request_cycle(),
            Err(Error::CycleInProgress(SampleState::AwaitingReference))
        );

        complete(&mut sampler, 1);
        assert_eq!(
            sampler.request_cycle(),
            Err(Error::CycleInProgress(SampleState::AwaitingThermistor))
        );

        // Only the two conversions of the running cycle were started.
        assert_eq!(sampler.converter().registers().conversions().len(), 2);
    }

    #[test]
    fn overflow_does_not_advance() {
        let mut sampler = sampler();
        sampler.request_cycle().unwrap();

        sampler.converter_mut().registers_mut().overflow();
        assert_eq!(
            sampler.on_interrupt(),
            Some(SamplerEvent::Overflow {
                state: SampleState::AwaitingReference
            })
        );
        assert_eq!(sampler.state(), SampleState::AwaitingReference);
        assert_eq!(sampler.on_interrupt(), None);

        complete(&mut sampler, 10);
        sampler.converter_mut().registers_mut().overflow();
        assert_eq!(
            sampler.on_interrupt(),
            Some(SamplerEvent::Overflow {
                state: SampleState::AwaitingThermistor
            })
        );

        assert_eq!(
            complete(&mut sampler, 20),
            Some(SamplerEvent::SampleReady(SamplesBuffer::new(10, 20)))
        );
    }

    #[test]
    fn overflow_and_result_pending_together() {
        let mut sampler = sampler();
        sampler.request_cycle().unwrap();

        sampler.converter_mut().registers_mut().complete(55);
        sampler.converter_mut().registers_mut().overflow();

        assert!(matches!(
            sampler.on_interrupt(),
            Some(SamplerEvent::Overflow { .. })
        ));
        assert_eq!(sampler.on_interrupt(), None);
        assert_eq!(sampler.state(), SampleState::AwaitingThermistor);
        assert_eq!(sampler.samples().reference(), 55);
    }

    #[test]
    fn spurious_result_while_idle() {
        let mut sampler = sampler();

        assert_eq!(complete(&mut sampler, 99), None);
        assert_eq!(sampler.state(), SampleState::Idle);
        assert_eq!(sampler.samples(), SamplesBuffer::default());
        assert!(sampler.converter().registers().conversions().is_empty());
    }

    #[test]
    fn no_pending_interrupt() {
        let mut sampler = sampler();
        sampler.request_cycle().unwrap();

        assert_eq!(sampler.on_interrupt(), None);
        assert_eq!(sampler.state(), SampleState::AwaitingReference);
    }

    #[test]
    fn consecutive_cycles_replace_both_slots() {
        let mut sampler = sampler();

        for (reference, thermistor) in [(100, 200), (300, 400), (0, u16::MAX)] {
            sampler.request_cycle().unwrap();
            complete(&mut sampler, reference);

            let event = complete(&mut sampler, thermistor);
            assert_eq!(
                event,
                Some(SamplerEvent::SampleReady(SamplesBuffer::new(
                    reference, thermistor
                )))
            );
        }
    }

    #[test]
    fn compensated_is_raw_thermistor() {
        let samples = SamplesBuffer::new(1000, 2345);
        assert_eq!(samples.compensated(), 2345);
        assert_eq!(samples.slots(), [1000, 2345]);
    }
}
