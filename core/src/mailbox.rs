//! Single slot hand-off of sampler events from interrupt context to the main flow.

use crate::sampling::{SamplerEvent, SamplesBuffer};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use log::warn;

pub struct Mailbox {
    slot: Signal<CriticalSectionRawMutex, SamplerEvent>,
}

impl Mailbox {
    pub const fn new() -> Self {
        Self {
            slot: Signal::new(),
        }
    }

    /// Posts `event`, replacing whatever is still unread.
    ///
    /// An unread [`SamplerEvent::SampleReady`] is never replaced by an overflow.
    ///
    /// Checking the slot and signalling are two separate steps, so this must only be called from
    /// the converter interrupt (or with it masked). The main flow cannot run in between there.
    pub fn post(&self, event: SamplerEvent) {
        if let SamplerEvent::Overflow { .. } = event {
            if let Some(ready @ SamplerEvent::SampleReady(_)) = self.slot.try_take() {
                self.slot.signal(ready);
                return;
            }
        }

        self.slot.signal(event);
    }

    pub fn try_take(&self) -> Option<SamplerEvent> {
        self.slot.try_take()
    }

    /// Drops whatever is still unread, returning `true` if there was something.
    pub fn clear(&self) -> bool {
        let pending = self.slot.signaled();
        self.slot.reset();
        pending
    }

    pub fn is_pending(&self) -> bool {
        self.slot.signaled()
    }

    /// Takes completed samples, discarding an overflow notification.
    pub fn take_samples(&self) -> Option<SamplesBuffer> {
        match self.slot.try_take()? {
            SamplerEvent::SampleReady(samples) => Some(samples),
            SamplerEvent::Overflow { state } => {
                warn!("Dropping overflow notification from state {:?}", state);
                None
            }
        }
    }

    /// Waits until a cycle completes.
    pub async fn wait_for_samples(&self) -> SamplesBuffer {
        loop {
            match self.slot.wait().await {
                SamplerEvent::SampleReady(samples) => return samples,
                SamplerEvent::Overflow { state } => {
                    warn!("Dropping overflow notification from state {:?}", state);
                }
            }
        }
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}
