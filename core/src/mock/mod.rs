//! Test doubles for the board collaborators
#![allow(dead_code)]

mod at;
mod flash;
mod fs;
mod wifi;

pub use at::ScriptedAt;
pub use flash::MockFlash;
pub use fs::MemFs;
pub use wifi::{ScriptedWifi, WifiCall};

use std::collections::VecDeque;
use std::string::String;
use std::vec::Vec;

use embedded_hal::digital::{ErrorKind, ErrorType, InputPin};
use hal_abstractions::BoardPrimitives;

/// Input pin with a settable level and one-shot read failures
pub struct MockPin {
    high: bool,
    fail_next: bool,
}

impl MockPin {
    pub fn new(high: bool) -> Self {
        Self {
            high,
            fail_next: false,
        }
    }

    pub fn set_high(&mut self, high: bool) {
        self.high = high;
    }

    pub fn fail_next_read(&mut self) {
        self.fail_next = true;
    }
}

impl ErrorType for MockPin {
    type Error = ErrorKind;
}

impl InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        if core::mem::take(&mut self.fail_next) {
            return Err(ErrorKind::Other);
        }
        Ok(self.high)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// Async delay that returns immediately and records what was asked
#[derive(Default)]
pub struct RecordingDelay {
    total_ns: u64,
    calls: usize,
}

impl RecordingDelay {
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl embedded_hal_async::delay::DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
        self.calls += 1;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.total_ns += u64::from(ms) * 1_000_000;
        self.calls += 1;
    }
}

/// Async delay that records each sleep, runs a hook after it, and can park
/// forever at a chosen sleep so an endless loop can be stopped from outside
pub struct ScriptedDelay<F> {
    sleeps: Vec<u32>,
    park_at: Option<usize>,
    after_sleep: F,
}

impl ScriptedDelay<fn(usize)> {
    pub fn new() -> Self {
        Self::with_hook(|_| {})
    }
}

impl<F: FnMut(usize)> ScriptedDelay<F> {
    /// `after_sleep` gets the number of sleeps completed so far
    pub fn with_hook(after_sleep: F) -> Self {
        Self {
            sleeps: Vec::new(),
            park_at: None,
            after_sleep,
        }
    }

    /// Never return from sleep number `n` (zero based)
    pub fn park_at(mut self, n: usize) -> Self {
        self.park_at = Some(n);
        self
    }

    /// Completed sleeps in milliseconds
    pub fn sleeps(&self) -> &[u32] {
        &self.sleeps
    }

    async fn sleep(&mut self, ms: u32) {
        if self.park_at == Some(self.sleeps.len()) {
            core::future::pending::<()>().await;
        }
        self.sleeps.push(ms);
        (self.after_sleep)(self.sleeps.len());
    }
}

impl<F: FnMut(usize)> embedded_hal_async::delay::DelayNs for ScriptedDelay<F> {
    async fn delay_ns(&mut self, ns: u32) {
        self.sleep(ns.div_ceil(1_000_000)).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.sleep(ms).await;
    }
}

/// Console board with scripted input
#[derive(Default)]
pub struct MockBoard {
    input: VecDeque<u8>,
    output: Vec<u8>,
    indicator: Option<bool>,
    tick: u32,
    /// Number of empty `get_char` polls before the scripted input shows up
    pub idle_polls: usize,
}

impl MockBoard {
    pub fn with_input(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    pub fn indicator(&self) -> Option<bool> {
        self.indicator
    }

    pub fn pending_input(&self) -> usize {
        self.input.len()
    }
}

impl BoardPrimitives for MockBoard {
    fn get_char(&mut self) -> Option<u8> {
        if self.idle_polls > 0 {
            self.idle_polls -= 1;
            return None;
        }
        self.input.pop_front()
    }

    fn put_char(&mut self, byte: u8) {
        self.output.push(byte);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.tick = self.tick.wrapping_add(ms);
    }

    fn tick_ms(&self) -> u32 {
        self.tick
    }

    fn set_indicator(&mut self, on: bool) {
        self.indicator = Some(on);
    }
}
