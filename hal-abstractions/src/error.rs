//! Error types shared by every board primitive
//!
//! Success is always the `Ok` side of a `Result`; the enums below cover the
//! remaining outcomes of the board status taxonomy.

/// Board-level status for primitive operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BoardError {
    /// Operation failed but the peripheral is still usable
    Recoverable,
    /// Peripheral is busy with a previous operation
    Busy,
    /// Operation did not complete in time
    Timeout,
    /// Argument rejected (address out of range, misaligned length, ...)
    BadParameter,
    /// Bring-up or geometry failure; the system must not continue
    Fatal,
}

impl BoardError {
    /// Whether this error requires halting the whole system
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal)
    }
}

impl core::fmt::Display for BoardError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable error"),
            Self::Busy => write!(f, "Busy"),
            Self::Timeout => write!(f, "Timeout"),
            Self::BadParameter => write!(f, "Bad parameter"),
            Self::Fatal => write!(f, "Fatal error"),
        }
    }
}

impl core::error::Error for BoardError {}

impl embedded_io::Error for BoardError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Self::Timeout => embedded_io::ErrorKind::TimedOut,
            Self::BadParameter => embedded_io::ErrorKind::InvalidInput,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

/// File system operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FsError {
    /// Path does not exist
    NotFound,
    /// Fewer bytes were written than requested
    SizeMismatch { expected: usize, actual: usize },
    /// File system is not mounted
    NotMounted,
    /// On-flash structure is not valid
    Corrupt,
    /// Handle is closed or was never opened
    BadHandle,
    /// Path does not fit in an entry name
    NameTooLong,
    /// No free pages left
    NoSpace,
    /// Underlying block device reported an error
    Device(BoardError),
}

impl core::fmt::Display for FsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "File not found"),
            Self::SizeMismatch { expected, actual } => {
                write!(f, "Size mismatch: expected {}, got {}", expected, actual)
            }
            Self::NotMounted => write!(f, "File system not mounted"),
            Self::Corrupt => write!(f, "File system corrupt"),
            Self::BadHandle => write!(f, "Bad file handle"),
            Self::NameTooLong => write!(f, "Name too long"),
            Self::NoSpace => write!(f, "No space left"),
            Self::Device(e) => write!(f, "Device error: {}", e),
        }
    }
}

impl core::error::Error for FsError {}

impl From<BoardError> for FsError {
    fn from(e: BoardError) -> Self {
        Self::Device(e)
    }
}

impl embedded_io::Error for FsError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Self::NotFound => embedded_io::ErrorKind::NotFound,
            Self::SizeMismatch { .. } => embedded_io::ErrorKind::WriteZero,
            Self::NameTooLong => embedded_io::ErrorKind::InvalidInput,
            Self::NoSpace => embedded_io::ErrorKind::OutOfMemory,
            Self::Corrupt => embedded_io::ErrorKind::InvalidData,
            Self::Device(e) => e.kind(),
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

/// Wi-Fi module operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WifiError {
    /// Module was not initialized
    NotInitialized,
    /// Bus transfer with the module failed
    Bus,
    /// Module did not answer in time
    Timeout,
    /// Module answered with an error status
    Rejected,
    /// Association succeeded but no address was assigned
    NoAddress,
    /// Operation requires an associated link
    NotConnected,
    /// Socket could not be bound after all attempts
    BindFailed,
    /// Response could not be parsed
    InvalidResponse,
    /// Response or payload does not fit the provided buffer
    BufferTooSmall,
}

impl core::fmt::Display for WifiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "Wi-Fi not initialized"),
            Self::Bus => write!(f, "Bus error"),
            Self::Timeout => write!(f, "Wi-Fi timeout"),
            Self::Rejected => write!(f, "Command rejected"),
            Self::NoAddress => write!(f, "No address assigned"),
            Self::NotConnected => write!(f, "Not connected"),
            Self::BindFailed => write!(f, "Socket bind failed"),
            Self::InvalidResponse => write!(f, "Invalid response"),
            Self::BufferTooSmall => write!(f, "Buffer too small"),
        }
    }
}

impl core::error::Error for WifiError {}

impl embedded_io::Error for WifiError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Self::Bus | Self::NotConnected => embedded_io::ErrorKind::BrokenPipe,
            Self::Timeout => embedded_io::ErrorKind::TimedOut,
            Self::InvalidResponse => embedded_io::ErrorKind::InvalidData,
            Self::BufferTooSmall => embedded_io::ErrorKind::OutOfMemory,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}
