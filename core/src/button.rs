//! User button to event bridge
//!
//! The edge interrupt samples the button level and compares it with the
//! sample taken at the previous interrupt. Only a Released -> Pressed
//! transition is an event: it flips the connectivity request flag and bumps
//! the event counter. Sampling only at interrupt instants is the debounce.
//!
//! The shared state is one flag and one counter, both atomics. It is split
//! once into an [`EdgeProducer`] (interrupt side) and an [`EventConsumer`]
//! (task side) so there is exactly one writer and one reader.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use embedded_hal::digital::InputPin;
use embedded_hal_async::delay::DelayNs;

/// Button level seen at an interrupt instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ButtonSample {
    Released = 0,
    Pressed = 1,
    /// Initial value, so the very first sample never counts as a transition
    NotAvailable = 2,
}

impl ButtonSample {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Released,
            1 => Self::Pressed,
            _ => Self::NotAvailable,
        }
    }

    /// Map a pin level to a sample
    pub fn from_level(is_high: bool, polarity: Polarity) -> Self {
        match (is_high, polarity) {
            (true, Polarity::ActiveHigh) | (false, Polarity::ActiveLow) => Self::Pressed,
            _ => Self::Released,
        }
    }
}

/// Electrical level of a pressed button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

/// Shared button state, placed in a `static`
pub struct ButtonEventSource {
    last: AtomicU8,
    requested: AtomicBool,
    events: AtomicU32,
    split: AtomicBool,
}

impl ButtonEventSource {
    pub const fn new() -> Self {
        Self {
            last: AtomicU8::new(ButtonSample::NotAvailable as u8),
            requested: AtomicBool::new(false),
            events: AtomicU32::new(0),
            split: AtomicBool::new(false),
        }
    }

    /// Hand out the producer and consumer handles
    ///
    /// Returns `None` after the first call.
    pub fn split(&self) -> Option<(EdgeProducer<'_>, EventConsumer<'_>)> {
        if self.split.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some((EdgeProducer { source: self }, EventConsumer { source: self }))
    }
}

impl Default for ButtonEventSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Interrupt-side handle; non-blocking and allocation free
pub struct EdgeProducer<'a> {
    source: &'a ButtonEventSource,
}

impl EdgeProducer<'_> {
    /// Record a sample taken at an edge interrupt
    ///
    /// Returns `true` when the sample completed a Released -> Pressed edge.
    pub fn on_edge(&mut self, current: ButtonSample) -> bool {
        let previous = ButtonSample::from_raw(
            self.source.last.swap(current as u8, Ordering::Relaxed),
        );

        if previous == ButtonSample::Released && current == ButtonSample::Pressed {
            self.source.requested.fetch_xor(true, Ordering::AcqRel);
            self.source.events.fetch_add(1, Ordering::Release);
            return true;
        }
        false
    }

    /// Sample `pin` and record it
    ///
    /// A failed pin read is recorded as [`ButtonSample::NotAvailable`], so the
    /// next press is not counted against a stale level.
    pub fn on_edge_interrupt<P: InputPin>(&mut self, pin: &mut P, polarity: Polarity) -> bool {
        let sample = match pin.is_high() {
            Ok(level) => ButtonSample::from_level(level, polarity),
            Err(_) => ButtonSample::NotAvailable,
        };
        self.on_edge(sample)
    }
}

/// Task-side handle
pub struct EventConsumer<'a> {
    source: &'a ButtonEventSource,
}

impl EventConsumer<'_> {
    /// Read the event counter and reset it in one atomic exchange
    pub fn take_event_count(&mut self) -> u32 {
        self.source.events.swap(0, Ordering::AcqRel)
    }

    /// Current value of the connectivity request flag
    pub fn connectivity_requested(&self) -> bool {
        self.source.requested.load(Ordering::Acquire)
    }

    /// Optionally log `prompt`, then sleep in 1 ms steps until an event arrives
    ///
    /// Returns the number of events consumed.
    pub async fn wait_for_event<D: DelayNs>(&mut self, prompt: Option<&str>, delay: &mut D) -> u32 {
        if let Some(prompt) = prompt {
            info!("{=str}", prompt);
        }

        loop {
            let count = self.take_event_count();
            if count > 0 {
                return count;
            }
            delay.delay_ms(1).await;
        }
    }
}
