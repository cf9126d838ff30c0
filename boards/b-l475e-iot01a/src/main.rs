#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _;
use rtic::app;
use rtic_monotonics::stm32::prelude::*;

mod board;
mod es_wifi_bus;
mod lfs;
mod qspi;

stm32_tim2_monotonic!(Mono, 1_000_000);

/// Async delay on the RTIC monotonic
pub struct MonoDelay;

impl embedded_hal_async::delay::DelayNs for MonoDelay {
    async fn delay_ns(&mut self, ns: u32) {
        Mono::delay(u64::from(ns.div_ceil(1000)).micros()).await;
    }

    async fn delay_us(&mut self, us: u32) {
        Mono::delay(u64::from(us).micros()).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        Mono::delay(u64::from(ms).millis()).await;
    }
}

/// Stop everything; only a reset gets the board out of here
fn fatal_halt() -> ! {
    defmt::error!("Halted");
    cortex_m::interrupt::disable();
    loop {
        cortex_m::asm::wfi();
    }
}

#[app(device = embassy_stm32, peripherals = true, dispatchers = [UART4, UART5, LPUART1])]
mod app {
    use super::*;
    use defmt::{error, info, warn};
    use embassy_stm32::exti::ExtiInput;
    use embassy_stm32::gpio::{Level, Output, Pull, Speed};
    use embassy_stm32::peripherals;
    use embassy_stm32::qspi::enums::{AddressSize, MemorySize};
    use embassy_stm32::qspi::{Config as QspiConfig, Qspi};
    use embassy_stm32::rcc::{Pll, PllMul, PllPreDiv, PllRDiv, PllSource, Sysclk};
    use embassy_stm32::spi::{self, Spi};
    use embassy_stm32::time::Hertz;
    use embassy_stm32::usart::{self, Uart};
    use hal_abstractions::{BlockStorage, BoardPrimitives, SecurityMode};
    use iot_core::button::{ButtonEventSource, EdgeProducer, EventConsumer, Polarity};
    use iot_core::command::CommandDispatcher;
    use iot_core::config::{DispatcherConfig, SupervisorConfig, WifiCredentials};
    use iot_core::connectivity::{ConnectivitySupervisor, EsWifi};
    use iot_core::storage::{wipe_with_consent, StorageManager};

    use crate::board::Board;
    use crate::es_wifi_bus::{EsWifiBus, EsWifiPeripherals};
    use crate::lfs::LittleFs;
    use crate::qspi::QspiFlash;

    type SpiPeripheral = embassy_stm32::Peri<'static, peripherals::SPI3>;
    type PinPC10 = embassy_stm32::Peri<'static, peripherals::PC10>;
    type PinPC12 = embassy_stm32::Peri<'static, peripherals::PC12>;
    type PinPC11 = embassy_stm32::Peri<'static, peripherals::PC11>;
    type PinPE0 = embassy_stm32::Peri<'static, peripherals::PE0>;
    type PinPE8 = embassy_stm32::Peri<'static, peripherals::PE8>;
    type PinPE1 = embassy_stm32::Peri<'static, peripherals::PE1>;
    type ExtiChannel = embassy_stm32::Peri<'static, peripherals::EXTI1>;
    type DmaTx = embassy_stm32::Peri<'static, peripherals::DMA2_CH2>;
    type DmaRx = embassy_stm32::Peri<'static, peripherals::DMA2_CH1>;

    struct WifiPeripherals {
        spi: SpiPeripheral,
        sck: PinPC10,
        mosi: PinPC12,
        miso: PinPC11,
        cs: PinPE0,
        reset: PinPE8,
        data_ready: PinPE1,
        exti: ExtiChannel,
        dma_tx: DmaTx,
        dma_rx: DmaRx,
    }

    type FileStore = LittleFs<QspiFlash>;

    static BUTTON: ButtonEventSource = ButtonEventSource::new();

    const WIFI_SSID: &str = match option_env!("WIFI_SSID") {
        Some(ssid) => ssid,
        None => "",
    };
    const WIFI_PASSWORD: &str = match option_env!("WIFI_PASSWORD") {
        Some(password) => password,
        None => "",
    };

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        board: Board,
        dispatcher: Option<CommandDispatcher<FileStore>>,
    }

    #[init]
    fn init(_cx: init::Context) -> (Shared, Local) {
        info!("B-L475E-IOT01A starting...");

        // HSI16 * 10 / 2 = 80 MHz SYSCLK, APB1 and APB2 undivided
        let mut config = embassy_stm32::Config::default();
        config.rcc.hsi = true;
        config.rcc.pll = Some(Pll {
            source: PllSource::HSI,
            prediv: PllPreDiv::DIV1,
            mul: PllMul::MUL10,
            divp: None,
            divq: None,
            divr: Some(PllRDiv::DIV2),
        });
        config.rcc.sys = Sysclk::PLL1_R;

        let p = embassy_stm32::init(config);

        // TIM2 on APB1 runs at SYSCLK
        Mono::start(80_000_000);
        info!("TIM2 monotonic timer initialized at 1 MHz");

        let mut uart_config = usart::Config::default();
        uart_config.baudrate = 115_200;
        let uart = match Uart::new_blocking(p.USART1, p.PB7, p.PB6, uart_config) {
            Ok(uart) => uart,
            Err(e) => {
                error!("Console init failed: {:?}", e);
                fatal_halt();
            }
        };
        let led = Output::new(p.PB14, Level::High, Speed::Low);
        let mut board = Board::new(uart, led);

        let mut qspi_config = QspiConfig::default();
        qspi_config.memory_size = MemorySize::_8MiB;
        qspi_config.address_size = AddressSize::_24bit;
        qspi_config.prescaler = 1;
        let bus = Qspi::new_blocking_bank1(
            p.QUADSPI, p.PE12, p.PE13, p.PE14, p.PE15, p.PE10, p.PE11, qspi_config,
        );

        let mut flash = QspiFlash::new(bus);
        match flash.init() {
            Ok(()) => info!("Flash status: {}", flash.status()),
            Err(e) if e.is_fatal() => {
                error!("Flash init failed: {}", e);
                fatal_halt();
            }
            // the mount below retries the init
            Err(e) => warn!("Flash init failed: {}", e),
        }

        let mut storage = StorageManager::new(LittleFs::new(flash));
        if storage.mount().is_err() {
            // the store is unusable, nothing else is started
            if let Err(e) = wipe_with_consent(&mut board, &mut storage) {
                error!("Wipe failed: {}", e);
            }
            fatal_halt();
        }

        board.put_str("Files:\n");
        match storage.list_files(|name| board.put_fmt(format_args!("- {}\n", name))) {
            Ok(count) => info!("{} files on flash", count),
            Err(e) => warn!("Listing failed: {}", e),
        }

        let Some((producer, consumer)) = BUTTON.split() else {
            error!("Button already in use");
            fatal_halt();
        };
        let button = ExtiInput::new(p.PC13, p.EXTI13, Pull::None);

        let wifi_periph = WifiPeripherals {
            spi: p.SPI3,
            sck: p.PC10,
            mosi: p.PC12,
            miso: p.PC11,
            cs: p.PE0,
            reset: p.PE8,
            data_ready: p.PE1,
            exti: p.EXTI1,
            dma_tx: p.DMA2_CH2,
            dma_rx: p.DMA2_CH1,
        };

        button_task::spawn(button, producer).ok();
        wifi_task::spawn(wifi_periph, consumer).ok();
        command_task::spawn().ok();

        let dispatcher = CommandDispatcher::new(storage, DispatcherConfig::default());
        (
            Shared {},
            Local {
                board,
                dispatcher: Some(dispatcher),
            },
        )
    }

    /// Samples the user button on every edge
    #[task(priority = 3)]
    async fn button_task(
        _cx: button_task::Context,
        mut button: ExtiInput<'static>,
        mut producer: EdgeProducer<'static>,
    ) -> ! {
        loop {
            button.wait_for_any_edge().await;
            // PC13 is pulled low while the button is held
            producer.on_edge_interrupt(&mut button, Polarity::ActiveLow);
        }
    }

    /// Wi-Fi task - brings the module up, then follows the button toggle
    #[task(priority = 1)]
    async fn wifi_task(
        _cx: wifi_task::Context,
        periph: WifiPeripherals,
        consumer: EventConsumer<'static>,
    ) {
        info!("Wi-Fi task started");

        let mut spi_config = spi::Config::default();
        spi_config.frequency = Hertz(10_000_000);

        let spi = Spi::new(
            periph.spi,
            periph.sck,
            periph.mosi,
            periph.miso,
            periph.dma_tx,
            periph.dma_rx,
            spi_config,
        );

        let bus = EsWifiBus::new(EsWifiPeripherals {
            spi,
            cs: Output::new(periph.cs, Level::High, Speed::VeryHigh),
            reset: Output::new(periph.reset, Level::High, Speed::Low),
            data_ready: ExtiInput::new(periph.data_ready, periph.exti, Pull::None),
        });

        let credentials = WifiCredentials {
            ssid: WIFI_SSID,
            password: WIFI_PASSWORD,
            security: if WIFI_PASSWORD.is_empty() {
                SecurityMode::Open
            } else {
                SecurityMode::Wpa2Psk
            },
        };

        match ConnectivitySupervisor::init(
            EsWifi::new(bus),
            credentials,
            SupervisorConfig::default(),
        )
        .await
        {
            Ok(supervisor) => {
                info!("Press the user button to toggle the connection");
                supervisor.run(consumer, &mut MonoDelay).await
            }
            Err(e) => {
                warn!("Could not initialize Wi-Fi: {}", e);
                warn!("Limited test availability");
            }
        }
    }

    /// Console command loop over the file store
    #[task(priority = 2, local = [board, dispatcher])]
    async fn command_task(cx: command_task::Context) {
        let Some(dispatcher) = cx.local.dispatcher.take() else {
            return;
        };
        info!("Commands: a=format b=delete all c=write d=read e=remove");
        dispatcher.run(cx.local.board, &mut MonoDelay).await
    }

    /// RTIC idle task - WFI sleep mode when no tasks active
    #[idle]
    fn idle(_cx: idle::Context) -> ! {
        loop {
            cortex_m::asm::wfi();
        }
    }
}
