//! MX25R6435F QSPI NOR flash, single-line SPI mode
//!
//! Commands used: JEDEC ID, status, write enable, page program, sector and
//! chip erase, deep power-down and its release. Busy polling is bounded by
//! per-operation timeouts taken from the datasheet maxima.

use defmt::{debug, error, info};
use embassy_stm32::mode::Blocking;
use embassy_stm32::peripherals::QUADSPI;
use embassy_stm32::qspi::enums::{DummyCycles, QspiWidth};
use embassy_stm32::qspi::{Qspi, TransferConfig};
use embassy_time::{Duration, Instant};
use hal_abstractions::{BlockStorage, BoardError, DeviceStatus, Geometry};
use iot_core::config::FLASH_GEOMETRY;

const CMD_READ: u8 = 0x03;
const CMD_PAGE_PROGRAM: u8 = 0x02;
const CMD_SECTOR_ERASE: u8 = 0x20;
const CMD_CHIP_ERASE: u8 = 0x60;
const CMD_WRITE_ENABLE: u8 = 0x06;
const CMD_READ_STATUS: u8 = 0x05;
const CMD_READ_ID: u8 = 0x9F;
const CMD_DEEP_POWER_DOWN: u8 = 0xB9;
const CMD_RELEASE_POWER_DOWN: u8 = 0xAB;

const STATUS_WIP: u8 = 1 << 0;
const STATUS_WEL: u8 = 1 << 1;

const MANUFACTURER_MACRONIX: u8 = 0xC2;

const PAGE_PROGRAM_TIMEOUT: Duration = Duration::from_millis(10);
const SECTOR_ERASE_TIMEOUT: Duration = Duration::from_millis(240);
const CHIP_ERASE_TIMEOUT: Duration = Duration::from_secs(240);
const STATUS_TIMEOUT: Duration = Duration::from_millis(5);

pub type QspiBus = Qspi<'static, QUADSPI, Blocking>;

/// External 8 MiB NOR flash behind the QUADSPI peripheral
pub struct QspiFlash {
    bus: QspiBus,
    initialized: bool,
}

impl QspiFlash {
    pub fn new(bus: QspiBus) -> Self {
        Self {
            bus,
            initialized: false,
        }
    }

    fn transfer(instruction: u8, address: Option<u32>) -> TransferConfig {
        TransferConfig {
            iwidth: QspiWidth::SING,
            awidth: QspiWidth::SING,
            dwidth: QspiWidth::SING,
            instruction,
            address,
            dummy: DummyCycles::_0,
        }
    }

    fn command(&mut self, instruction: u8) {
        self.bus.blocking_command(Self::transfer(instruction, None));
    }

    fn read_status(&mut self) -> u8 {
        let mut status = [0u8; 1];
        self.bus.blocking_read(&mut status, Self::transfer(CMD_READ_STATUS, None));
        status[0]
    }

    fn wait_idle(&mut self, timeout: Duration) -> Result<(), BoardError> {
        let deadline = Instant::now() + timeout;
        while self.read_status() & STATUS_WIP != 0 {
            if Instant::now() > deadline {
                return Err(BoardError::Timeout);
            }
        }
        Ok(())
    }

    fn write_enable(&mut self) -> Result<(), BoardError> {
        self.command(CMD_WRITE_ENABLE);
        let deadline = Instant::now() + STATUS_TIMEOUT;
        while self.read_status() & STATUS_WEL == 0 {
            if Instant::now() > deadline {
                return Err(BoardError::Timeout);
            }
        }
        Ok(())
    }

    /// Geometry derived from the JEDEC ID (density byte is log2 of the size)
    fn reported_geometry(&mut self) -> Result<Geometry, BoardError> {
        let mut id = [0u8; 3];
        self.bus.blocking_read(&mut id, Self::transfer(CMD_READ_ID, None));
        info!("Flash JEDEC ID: {:02x} {:02x} {:02x}", id[0], id[1], id[2]);

        if id[0] != MANUFACTURER_MACRONIX || !(16..=31).contains(&id[2]) {
            error!("Unexpected flash part");
            return Err(BoardError::Fatal);
        }
        Ok(Geometry::new(1 << id[2], 4096, 256))
    }

    fn ready(&self) -> Result<(), BoardError> {
        if self.initialized {
            Ok(())
        } else {
            Err(BoardError::Recoverable)
        }
    }
}

impl BlockStorage for QspiFlash {
    const GEOMETRY: Geometry = FLASH_GEOMETRY;

    fn init(&mut self) -> Result<(), BoardError> {
        if self.initialized {
            return Ok(());
        }

        self.command(CMD_RELEASE_POWER_DOWN);
        let reported = self.reported_geometry()?;
        Self::GEOMETRY.verify(&reported).inspect_err(|_| {
            error!(
                "Flash geometry mismatch: expected {} bytes, part reports {}",
                Self::GEOMETRY.total_size,
                reported.total_size
            );
        })?;
        self.wait_idle(STATUS_TIMEOUT)?;

        self.initialized = true;
        Ok(())
    }

    fn deinit(&mut self) -> Result<(), BoardError> {
        if !self.initialized {
            return Ok(());
        }
        self.wait_idle(CHIP_ERASE_TIMEOUT)?;
        self.command(CMD_DEEP_POWER_DOWN);
        self.initialized = false;
        Ok(())
    }

    fn status(&mut self) -> DeviceStatus {
        if !self.initialized {
            return DeviceStatus::Error;
        }
        if self.read_status() & STATUS_WIP != 0 {
            DeviceStatus::Busy
        } else {
            DeviceStatus::Ready
        }
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), BoardError> {
        self.ready()?;
        Self::GEOMETRY.check_range(addr, buf.len())?;
        if buf.is_empty() {
            return Ok(());
        }
        self.bus.blocking_read(buf, Self::transfer(CMD_READ, Some(addr)));
        Ok(())
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), BoardError> {
        self.ready()?;
        Self::GEOMETRY.check_range(addr, data.len())?;

        let page = Self::GEOMETRY.page_size;
        let mut addr = addr;
        let mut rest = data;
        while !rest.is_empty() {
            // a program operation must not cross a page boundary
            let room = (page - addr % page) as usize;
            let (chunk, tail) = rest.split_at(room.min(rest.len()));

            self.write_enable()?;
            self.bus.blocking_write(chunk, Self::transfer(CMD_PAGE_PROGRAM, Some(addr)));
            self.wait_idle(PAGE_PROGRAM_TIMEOUT)?;

            addr += chunk.len() as u32;
            rest = tail;
        }
        Ok(())
    }

    fn erase_block(&mut self, addr: u32) -> Result<(), BoardError> {
        self.ready()?;
        Self::GEOMETRY.check_range(addr, 1)?;
        let base = Self::GEOMETRY.sector_base(addr);

        self.write_enable()?;
        self.bus.blocking_command(Self::transfer(CMD_SECTOR_ERASE, Some(base)));
        self.wait_idle(SECTOR_ERASE_TIMEOUT)
    }

    fn erase_all(&mut self) -> Result<(), BoardError> {
        self.ready()?;
        debug!("Chip erase started");
        self.write_enable()?;
        self.command(CMD_CHIP_ERASE);
        self.wait_idle(CHIP_ERASE_TIMEOUT)
    }
}
