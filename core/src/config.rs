//! Compile-time configuration
//!
//! Everything here is fixed at build time; nothing is negotiated with the
//! hardware at runtime apart from the flash geometry check.

use hal_abstractions::{Geometry, SecurityMode};

/// Flash geometry of the MX25R6435F QSPI NOR part (8 MiB, 4 KiB sectors, 256 B pages)
pub const FLASH_GEOMETRY: Geometry = Geometry::new(8 * 1024 * 1024, 4 * 1024, 256);

/// Connectivity supervisor configuration
#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    /// Delay between two polls of the desired state
    pub poll_interval_ms: u32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
        }
    }
}

/// Access point credentials
#[derive(Debug, Clone, Copy, Default)]
pub struct WifiCredentials {
    pub ssid: &'static str,
    pub password: &'static str,
    pub security: SecurityMode,
}

/// Bounded retry with a fixed delay between attempts
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total number of attempts, first one included
    pub attempts: u16,
    /// Delay between two attempts
    pub delay_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay_ms: 100,
        }
    }
}

/// Size of the fixed test record
pub const TEST_RECORD_LEN: usize = 16;

/// Command dispatcher configuration
#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    /// Delay before the first read, lets the network task print its banner
    pub startup_delay_ms: u32,
    /// Sleep after an ignored input byte
    pub invalid_input_delay_ms: u32,
    /// Path of the test record
    pub record_path: &'static str,
    /// Content of the test record
    pub record_data: [u8; TEST_RECORD_LEN],
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        let mut record_data = [0u8; TEST_RECORD_LEN];
        record_data[..3].copy_from_slice(b"123");
        Self {
            startup_delay_ms: 1000,
            invalid_input_delay_ms: 100,
            record_path: "abc",
            record_data,
        }
    }
}

/// Buffer sizes of the file system, fixed at build time
pub struct StorageLayout;

impl StorageLayout {
    /// Logical page size
    pub const LOG_PAGE_SIZE: usize = 256;
    /// Working buffer, at least two logical pages
    pub const WORK_BUFFER_SIZE: usize = Self::LOG_PAGE_SIZE * 2;
    /// Bytes per file descriptor
    pub const FILE_DESCRIPTOR_SIZE: usize = 44;
    /// Descriptors that may be open at the same time
    pub const MAX_FILE_DESCRIPTORS: usize = 4;
    pub const FILE_DESCRIPTOR_BUFFER_SIZE: usize =
        Self::FILE_DESCRIPTOR_SIZE * Self::MAX_FILE_DESCRIPTORS;
    /// Pages held in the read/write cache
    pub const CACHE_PAGES: usize = 4;
    pub const CACHE_BUFFER_SIZE: usize =
        (Self::LOG_PAGE_SIZE + Self::FILE_DESCRIPTOR_SIZE) * Self::CACHE_PAGES;
}
