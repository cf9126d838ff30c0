//! Platform-agnostic core logic for IoT firmware
//!
//! This crate contains business logic that can be shared across all
//! supported boards. It has NO hardware dependencies: everything it touches
//! goes through the traits of `hal-abstractions`.
//!
//! - **`button`**: user button edge to event bridge
//! - **`connectivity`**: connectivity supervisor, UDP sockets, ES-WiFi client
//! - **`storage`**: flash file store lifecycle and recovery
//! - **`command`**: single-key file system command dispatcher

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// must come first, the logging macros are textually scoped
mod fmt;

pub mod button;
pub mod command;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod storage;

#[cfg(test)]
mod mock;

pub use error::StorageError;
