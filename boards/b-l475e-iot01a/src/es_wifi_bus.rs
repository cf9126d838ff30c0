//! SPI framing for the Inventek ES-WiFi module
//!
//! The module talks in 16-bit words, so every byte pair goes out swapped
//! and odd transfers are padded with `\n`. DRDY high means the module can
//! take a command, or has reply data while a read is in progress. Replies
//! are padded with 0x15 up to a word boundary.

use defmt::{debug, info, warn};
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::Output;
use embassy_stm32::mode::Async;
use embassy_stm32::spi::Spi;
use embassy_time::{with_timeout, Duration, Timer};
use hal_abstractions::{AtTransport, WifiError};

const PAD_TX: u8 = b'\n';
const PAD_RX: u8 = 0x15;
const PROMPT: &[u8] = b"\r\n> ";

const COMMAND_READY_TIMEOUT: Duration = Duration::from_millis(1000);
const RESPONSE_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Words sent per SPI burst
const CHUNK_WORDS: usize = 32;

/// ES-WiFi peripherals bundle
pub struct EsWifiPeripherals<'a> {
    pub spi: Spi<'a, Async>,
    pub cs: Output<'a>,
    pub reset: Output<'a>,
    pub data_ready: ExtiInput<'a>,
}

/// [`AtTransport`] over the ES-WiFi SPI link
pub struct EsWifiBus {
    spi: Spi<'static, Async>,
    cs: Output<'static>,
    reset: Output<'static>,
    data_ready: ExtiInput<'static>,
}

impl EsWifiBus {
    pub fn new(periph: EsWifiPeripherals<'static>) -> Self {
        let EsWifiPeripherals {
            spi,
            mut cs,
            reset,
            data_ready,
        } = periph;
        cs.set_high();
        Self {
            spi,
            cs,
            reset,
            data_ready,
        }
    }

    async fn wait_ready(&mut self, timeout: Duration) -> Result<(), WifiError> {
        with_timeout(timeout, self.data_ready.wait_for_high())
            .await
            .map_err(|_| WifiError::Timeout)
    }

    /// Send `command` followed by `payload` as one swapped word stream
    async fn send(&mut self, command: &[u8], payload: &[u8]) -> Result<(), WifiError> {
        let mut bytes = command.iter().chain(payload).copied();
        let mut words = [0u8; CHUNK_WORDS * 2];

        loop {
            let mut len = 0;
            while len < words.len() {
                let Some(first) = bytes.next() else {
                    break;
                };
                let second = bytes.next().unwrap_or(PAD_TX);
                words[len] = second;
                words[len + 1] = first;
                len += 2;
            }
            if len == 0 {
                return Ok(());
            }
            self.spi
                .write(&words[..len])
                .await
                .map_err(|_| WifiError::Bus)?;
        }
    }

    /// Clock out words while DRDY stays high
    async fn receive(&mut self, response: &mut [u8]) -> Result<usize, WifiError> {
        let mut n = 0;
        while self.data_ready.is_high() {
            let slot = response
                .get_mut(n..n + 2)
                .ok_or(WifiError::BufferTooSmall)?;
            let mut word = [0u8; 2];
            self.spi
                .transfer(&mut word, &[PAD_TX, PAD_TX])
                .await
                .map_err(|_| WifiError::Bus)?;
            slot[0] = word[1];
            slot[1] = word[0];
            n += 2;
        }

        while n > 0 && response[n - 1] == PAD_RX {
            n -= 1;
        }
        Ok(n)
    }

    async fn read_reply(&mut self, response: &mut [u8]) -> Result<usize, WifiError> {
        self.cs.set_low();
        let result = self.receive(response).await;
        self.cs.set_high();
        result
    }
}

impl AtTransport for EsWifiBus {
    async fn reset(&mut self) -> Result<(), WifiError> {
        info!("Performing ES-WiFi hardware reset...");
        self.cs.set_high();
        self.reset.set_low();
        Timer::after_millis(10).await;
        self.reset.set_high();
        Timer::after_millis(500).await;

        self.wait_ready(COMMAND_READY_TIMEOUT).await?;
        let mut prompt = [0u8; 16];
        let n = self.read_reply(&mut prompt).await?;
        if !prompt[..n].ends_with(PROMPT) {
            warn!("Unexpected boot prompt: {=[u8]}", &prompt[..n]);
            return Err(WifiError::InvalidResponse);
        }
        debug!("ES-WiFi ready");
        Ok(())
    }

    async fn exchange(
        &mut self,
        command: &[u8],
        payload: &[u8],
        response: &mut [u8],
    ) -> Result<usize, WifiError> {
        self.wait_ready(COMMAND_READY_TIMEOUT).await?;

        self.cs.set_low();
        let sent = self.send(command, payload).await;
        self.cs.set_high();
        sent?;

        // DRDY drops while the module works on the command
        with_timeout(COMMAND_READY_TIMEOUT, self.data_ready.wait_for_low())
            .await
            .map_err(|_| WifiError::Timeout)?;
        self.wait_ready(RESPONSE_TIMEOUT).await?;

        self.read_reply(response).await
    }
}
