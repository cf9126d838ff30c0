//! Desired vs. actual connectivity reconciliation

use core::net::Ipv4Addr;

use embedded_hal_async::delay::DelayNs;
use hal_abstractions::{MacAddress, WifiError, WifiTransport};

use crate::button::EventConsumer;
use crate::config::{SupervisorConfig, WifiCredentials};

/// Link state as seen by the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectivityState {
    #[default]
    Disconnected,
    Connected,
}

/// Outcome of one poll tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Desired and actual state already match
    Unchanged,
    Connected(Ipv4Addr),
    Disconnected,
    /// Still disconnected, retried next tick
    ConnectFailed(WifiError),
    /// Still connected, retried next tick
    DisconnectFailed(WifiError),
}

/// Polling supervisor driving a [`WifiTransport`] toward the requested state
///
/// Only constructed through [`init`](Self::init), so a supervisor never polls
/// an uninitialized module.
pub struct ConnectivitySupervisor<W> {
    transport: W,
    credentials: WifiCredentials,
    config: SupervisorConfig,
    state: ConnectivityState,
    address: Option<Ipv4Addr>,
    mac: MacAddress,
}

impl<W: WifiTransport> ConnectivitySupervisor<W> {
    /// Initialize the module; the error is returned with nothing retried
    pub async fn init(
        mut transport: W,
        credentials: WifiCredentials,
        config: SupervisorConfig,
    ) -> Result<Self, WifiError> {
        let mac = transport.init().await?;
        info!("Wi-Fi initialized, MAC address: {}", mac);

        Ok(Self {
            transport,
            credentials,
            config,
            state: ConnectivityState::Disconnected,
            address: None,
            mac,
        })
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    /// Address acquired by the current connection
    pub fn address(&self) -> Option<Ipv4Addr> {
        self.address
    }

    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    pub fn transport(&mut self) -> &mut W {
        &mut self.transport
    }

    /// One reconciliation step against the last observed intent
    ///
    /// Issues at most one connect or disconnect attempt.
    pub async fn poll(&mut self, connect_requested: bool) -> Transition {
        match (connect_requested, self.state) {
            (true, ConnectivityState::Disconnected) => {
                info!("Enable Wi-Fi");
                match self.connect().await {
                    Ok(ip) => {
                        self.state = ConnectivityState::Connected;
                        self.address = Some(ip);
                        Transition::Connected(ip)
                    }
                    Err(e) => {
                        warn!("Failure to enable Wi-Fi: {}", e);
                        Transition::ConnectFailed(e)
                    }
                }
            }
            (false, ConnectivityState::Connected) => {
                info!("Disable Wi-Fi");
                match self.transport.disconnect().await {
                    Ok(()) => {
                        self.state = ConnectivityState::Disconnected;
                        self.address = None;
                        Transition::Disconnected
                    }
                    Err(e) => {
                        warn!("Failure to disable Wi-Fi: {}", e);
                        Transition::DisconnectFailed(e)
                    }
                }
            }
            _ => Transition::Unchanged,
        }
    }

    /// Associate, then acquire an address
    ///
    /// A failure after association rolls the association back, so a
    /// half-connected link is never reported.
    async fn connect(&mut self) -> Result<Ipv4Addr, WifiError> {
        let WifiCredentials {
            ssid,
            password,
            security,
        } = self.credentials;

        self.transport.connect(ssid, password, security).await?;

        match self.acquire_address().await {
            Ok(ip) => {
                let [a, b, c, d] = ip.octets();
                info!("Connected to {=str}, address {}.{}.{}.{}", ssid, a, b, c, d);
                Ok(ip)
            }
            Err(e) => {
                if self.transport.disconnect().await.is_err() {
                    debug!("Rollback disconnect failed");
                }
                Err(e)
            }
        }
    }

    async fn acquire_address(&mut self) -> Result<Ipv4Addr, WifiError> {
        let ip = self.transport.assigned_address().await?;
        if ip.is_unspecified() {
            return Err(WifiError::NoAddress);
        }
        if !self.transport.is_connected().await {
            return Err(WifiError::NotConnected);
        }
        Ok(ip)
    }

    /// Poll forever at the configured interval
    ///
    /// Toggles that happen between two polls collapse to the last value.
    pub async fn run<D: DelayNs>(mut self, mut button: EventConsumer<'_>, delay: &mut D) -> ! {
        loop {
            let presses = button.take_event_count();
            if presses > 1 {
                debug!("{} button events since last poll", presses);
            }
            self.poll(button.connectivity_requested()).await;
            delay.delay_ms(self.config.poll_interval_ms).await;
        }
    }
}
