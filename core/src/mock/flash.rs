use std::vec;
use std::vec::Vec;

use hal_abstractions::{BlockStorage, BoardError, DeviceStatus, Geometry};

/// RAM-backed NOR flash
pub struct MockFlash {
    data: Vec<u8>,
    initialized: bool,
    /// Make the next `erase_all` fail
    pub fail_erase: bool,
    erase_all_calls: usize,
    power_ups: usize,
}

impl MockFlash {
    pub fn new() -> Self {
        Self {
            data: vec![0xFF; Self::GEOMETRY.total_size as usize],
            initialized: false,
            fail_erase: false,
            erase_all_calls: 0,
            power_ups: 0,
        }
    }

    pub fn erase_all_calls(&self) -> usize {
        self.erase_all_calls
    }

    /// `init` calls that actually brought the device up
    pub fn power_ups(&self) -> usize {
        self.power_ups
    }

    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&b| b == 0xFF)
    }

    fn ready(&self) -> Result<(), BoardError> {
        if self.initialized {
            Ok(())
        } else {
            Err(BoardError::Recoverable)
        }
    }
}

impl BlockStorage for MockFlash {
    const GEOMETRY: Geometry = Geometry::new(64 * 1024, 4096, 256);

    fn init(&mut self) -> Result<(), BoardError> {
        if !self.initialized {
            self.initialized = true;
            self.power_ups += 1;
        }
        Ok(())
    }

    fn deinit(&mut self) -> Result<(), BoardError> {
        self.initialized = false;
        Ok(())
    }

    fn status(&mut self) -> DeviceStatus {
        if self.initialized {
            DeviceStatus::Ready
        } else {
            DeviceStatus::Error
        }
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), BoardError> {
        self.ready()?;
        Self::GEOMETRY.check_range(addr, buf.len())?;
        let start = addr as usize;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        Ok(())
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), BoardError> {
        self.ready()?;
        Self::GEOMETRY.check_range(addr, data.len())?;
        let start = addr as usize;
        // NOR programming only clears bits
        for (cell, byte) in self.data[start..start + data.len()].iter_mut().zip(data) {
            *cell &= *byte;
        }
        Ok(())
    }

    fn erase_block(&mut self, addr: u32) -> Result<(), BoardError> {
        self.ready()?;
        Self::GEOMETRY.check_range(addr, 1)?;
        let base = Self::GEOMETRY.sector_base(addr) as usize;
        let size = Self::GEOMETRY.sector_size as usize;
        self.data[base..base + size].fill(0xFF);
        Ok(())
    }

    fn erase_all(&mut self) -> Result<(), BoardError> {
        self.ready()?;
        self.erase_all_calls += 1;
        if core::mem::take(&mut self.fail_erase) {
            return Err(BoardError::Timeout);
        }
        self.data.fill(0xFF);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_a_no_op() {
        let mut flash = MockFlash::new();
        assert_eq!(flash.init(), Ok(()));
        flash.write(0, b"abc").unwrap();

        assert_eq!(flash.init(), Ok(()));
        assert_eq!(flash.power_ups(), 1);
        let mut buf = [0u8; 3];
        flash.read(0, &mut buf).unwrap();
        assert_eq!(&buf, b"abc");
    }

    #[test]
    fn test_status_follows_init_and_deinit() {
        let mut flash = MockFlash::new();
        assert_eq!(flash.status(), DeviceStatus::Error);

        flash.init().unwrap();
        assert_eq!(flash.status(), DeviceStatus::Ready);

        assert_eq!(flash.deinit(), Ok(()));
        assert_eq!(flash.status(), DeviceStatus::Error);
        let mut buf = [0u8; 1];
        assert_eq!(flash.read(0, &mut buf), Err(BoardError::Recoverable));

        flash.init().unwrap();
        assert_eq!(flash.power_ups(), 2);
        assert_eq!(flash.status(), DeviceStatus::Ready);
    }
}
