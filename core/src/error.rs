//! Storage lifecycle error types

use hal_abstractions::{BoardError, FsError};

/// Storage lifecycle errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Operation needs a mounted file system
    NotMounted,
    /// Mount failed; operator consent is needed before wiping
    Corrupt,
    /// Flash was wiped this session; restart required
    Wiped,
    /// File system reported an error
    Fs(FsError),
    /// Block device reported an error
    Device(BoardError),
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotMounted => write!(f, "File system not mounted"),
            Self::Corrupt => write!(f, "Could not init filesystem"),
            Self::Wiped => write!(f, "Memory wiped, restart the board"),
            Self::Fs(e) => write!(f, "File system error: {}", e),
            Self::Device(e) => write!(f, "Device error: {}", e),
        }
    }
}

impl core::error::Error for StorageError {}

impl From<FsError> for StorageError {
    fn from(e: FsError) -> Self {
        match e {
            FsError::NotMounted => Self::NotMounted,
            FsError::Device(d) => Self::Device(d),
            other => Self::Fs(other),
        }
    }
}

impl From<BoardError> for StorageError {
    fn from(e: BoardError) -> Self {
        Self::Device(e)
    }
}
