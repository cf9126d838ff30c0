//! Network connectivity
//!
//! - [`ConnectivitySupervisor`]: reconciles the button-driven intent with the
//!   actual link state
//! - [`udp`]: socket helpers with bounded bind retry
//! - [`es_wifi`]: `WifiTransport` over the Inventek ES-WiFi AT command set

pub mod es_wifi;
pub mod supervisor;
pub mod udp;

pub use es_wifi::EsWifi;
pub use supervisor::{ConnectivityState, ConnectivitySupervisor, Transition};
pub use udp::UdpSocket;
