//! Hardware abstraction traits for IoT firmware
//!
//! This crate defines traits that abstract over hardware differences
//! between boards. BSPs implement these traits; the platform-agnostic
//! logic in `iot-core` is written against them and tested with doubles.
//!
//! - **`board`**: console, delay, tick and indicator primitives
//! - **`storage`**: block-addressed NOR flash with fixed geometry
//! - **`fs`**: file system layered on top of the flash device
//! - **`wifi`**: Wi-Fi module transport (association, DHCP, UDP sockets)
//! - **`error`**: shared status taxonomy

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod board;
pub mod error;
pub mod fs;
pub mod storage;
pub mod wifi;

pub use board::BoardPrimitives;
pub use error::{BoardError, FsError, WifiError};
pub use fs::{BlockFileSystem, DirCursor, EntryName, OpenMode, SeekFrom};
pub use storage::{BlockStorage, DeviceStatus, Geometry};
pub use wifi::{AtTransport, MacAddress, SecurityMode, SocketId, WifiTransport};
