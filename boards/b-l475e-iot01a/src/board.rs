//! Console and indicator primitives

use embassy_stm32::gpio::Output;
use embassy_stm32::mode::Blocking;
use embassy_stm32::usart::Uart;
use hal_abstractions::BoardPrimitives;

/// Core clock, used to size busy-wait delays
const CORE_CLOCK_HZ: u32 = 80_000_000;

/// ST-LINK virtual COM port (USART1) plus the green user LED
pub struct Board {
    uart: Uart<'static, Blocking>,
    led: Output<'static>,
}

impl Board {
    pub fn new(uart: Uart<'static, Blocking>, led: Output<'static>) -> Self {
        Self { uart, led }
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        // the console has nowhere to report its own failures
        if self.uart.blocking_write(bytes).is_err() {
            defmt::warn!("Console write failed");
        }
    }
}

impl BoardPrimitives for Board {
    fn get_char(&mut self) -> Option<u8> {
        self.uart.nb_read().ok()
    }

    fn put_char(&mut self, byte: u8) {
        self.write_bytes(&[byte]);
    }

    fn put_str(&mut self, text: &str) {
        self.write_bytes(text.as_bytes());
    }

    /// Busy-waits on the cycle counter, usable before the scheduler runs
    fn delay_ms(&mut self, ms: u32) {
        cortex_m::asm::delay(ms.saturating_mul(CORE_CLOCK_HZ / 1000));
    }

    fn tick_ms(&self) -> u32 {
        embassy_time::Instant::now().as_millis() as u32
    }

    fn set_indicator(&mut self, on: bool) {
        if on {
            self.led.set_high();
        } else {
            self.led.set_low();
        }
    }
}
