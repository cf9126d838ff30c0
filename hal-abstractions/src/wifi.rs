//! Wi-Fi module transport interfaces
//!
//! Two layers:
//! - [`AtTransport`]: raw command/response exchange with an AT-style module
//!   (bus framing lives in the BSP)
//! - [`WifiTransport`]: network-level operations the supervisor drives

use core::future::Future;
use core::net::{Ipv4Addr, SocketAddrV4};

use crate::error::WifiError;

/// Hardware (MAC) address of the module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MacAddress(pub [u8; 6]);

impl core::fmt::Display for MacAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

/// Access point security mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SecurityMode {
    #[default]
    Open,
    Wep,
    WpaPsk,
    Wpa2Psk,
    WpaWpa2Psk,
}

impl SecurityMode {
    /// Numeric code used by the module's command set
    pub fn code(&self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Wep => 1,
            Self::WpaPsk => 2,
            Self::Wpa2Psk => 3,
            Self::WpaWpa2Psk => 4,
        }
    }
}

/// Module-side socket number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SocketId(pub u8);

/// Command/response exchange with an AT-style module
pub trait AtTransport {
    /// Pulse the module reset line and wait for its first prompt
    fn reset(&mut self) -> impl Future<Output = Result<(), WifiError>>;

    /// Send `command` followed by `payload`, collect the reply into `response`
    ///
    /// Returns the number of response bytes, prompt included.
    fn exchange(
        &mut self,
        command: &[u8],
        payload: &[u8],
        response: &mut [u8],
    ) -> impl Future<Output = Result<usize, WifiError>>;
}

/// Network-level Wi-Fi operations
pub trait WifiTransport {
    /// Initialize the module and read its hardware address
    fn init(&mut self) -> impl Future<Output = Result<MacAddress, WifiError>>;

    /// Associate with an access point
    fn connect(
        &mut self,
        ssid: &str,
        password: &str,
        security: SecurityMode,
    ) -> impl Future<Output = Result<(), WifiError>>;

    /// IPv4 address obtained after association
    fn assigned_address(&mut self) -> impl Future<Output = Result<Ipv4Addr, WifiError>>;

    fn is_connected(&mut self) -> impl Future<Output = bool>;

    /// One attempt at opening a UDP socket bound to `local_port`
    fn start_udp(
        &mut self,
        socket: SocketId,
        local_port: u16,
    ) -> impl Future<Output = Result<(), WifiError>>;

    fn send_to(
        &mut self,
        socket: SocketId,
        data: &[u8],
        remote: SocketAddrV4,
        timeout_ms: u32,
    ) -> impl Future<Output = Result<usize, WifiError>>;

    fn receive_from(
        &mut self,
        socket: SocketId,
        buf: &mut [u8],
        timeout_ms: u32,
    ) -> impl Future<Output = Result<(usize, SocketAddrV4), WifiError>>;

    fn close(&mut self, socket: SocketId) -> impl Future<Output = Result<(), WifiError>>;

    fn disconnect(&mut self) -> impl Future<Output = Result<(), WifiError>>;
}
