//! Block-addressed NOR flash interface
//!
//! # Flash Characteristics
//!
//! - Erase happens at sector granularity and sets bytes to 0xFF
//! - Programming happens at page granularity and can only clear bits
//! - Geometry is fixed at build time and checked against the part at init;
//!   a mismatch is fatal because every address computation depends on it

use crate::error::BoardError;

/// Flash geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Geometry {
    /// Total capacity in bytes
    pub total_size: u32,
    /// Erase granularity in bytes
    pub sector_size: u32,
    /// Program granularity in bytes
    pub page_size: u32,
}

impl Geometry {
    pub const fn new(total_size: u32, sector_size: u32, page_size: u32) -> Self {
        Self {
            total_size,
            sector_size,
            page_size,
        }
    }

    pub const fn sector_count(&self) -> u32 {
        self.total_size / self.sector_size
    }

    pub const fn page_count(&self) -> u32 {
        self.total_size / self.page_size
    }

    /// Compare the build-time geometry against what the part reports
    ///
    /// Sector and page counts are compared too, so a part that reports a
    /// consistent but different layout is rejected as well.
    pub fn verify(&self, reported: &Geometry) -> Result<(), BoardError> {
        if self.total_size != reported.total_size
            || self.sector_size != reported.sector_size
            || self.sector_count() != reported.sector_count()
            || self.page_size != reported.page_size
            || self.page_count() != reported.page_count()
        {
            return Err(BoardError::Fatal);
        }
        Ok(())
    }

    /// Check that `[addr, addr + len)` lies inside the device
    pub fn check_range(&self, addr: u32, len: usize) -> Result<(), BoardError> {
        let end = (addr as u64) + (len as u64);
        if end > self.total_size as u64 {
            return Err(BoardError::BadParameter);
        }
        Ok(())
    }

    /// Start address of the sector containing `addr`
    pub const fn sector_base(&self, addr: u32) -> u32 {
        addr - (addr % self.sector_size)
    }
}

/// Device readiness as reported by the status register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceStatus {
    Ready,
    Busy,
    Error,
}

/// Block storage device
///
/// # Safety Invariants
///
/// - `init` must succeed before any other call
/// - Only one owner per device (no concurrent access)
pub trait BlockStorage {
    /// Build-time geometry of the device
    const GEOMETRY: Geometry;

    /// Bring the device up and verify its geometry
    ///
    /// Calling `init` on an initialized device is a no-op. Returns
    /// `BoardError::Fatal` when the device cannot be initialized or its
    /// geometry differs from [`Self::GEOMETRY`].
    fn init(&mut self) -> Result<(), BoardError>;

    /// Release the device
    fn deinit(&mut self) -> Result<(), BoardError>;

    /// Current device status
    fn status(&mut self) -> DeviceStatus;

    /// Read `buf.len()` bytes starting at `addr`
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), BoardError>;

    /// Program `data` starting at `addr` (target must be erased)
    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), BoardError>;

    /// Erase the sector containing `addr`
    fn erase_block(&mut self, addr: u32) -> Result<(), BoardError>;

    /// Erase the whole device
    fn erase_all(&mut self) -> Result<(), BoardError>;
}
