use core::net::{Ipv4Addr, SocketAddrV4};
use std::collections::VecDeque;
use std::vec::Vec;

use hal_abstractions::{MacAddress, SecurityMode, SocketId, WifiError, WifiTransport};

/// Calls seen by [`ScriptedWifi`], in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WifiCall {
    Init,
    Connect,
    AssignedAddress,
    IsConnected,
    StartUdp(u8, u16),
    SendTo(u8, usize),
    ReceiveFrom(u8),
    Close(u8),
    Disconnect,
}

/// Wi-Fi transport whose operations fail a scripted number of times
pub struct ScriptedWifi {
    pub mac: MacAddress,
    pub address: Ipv4Addr,
    pub init_error: Option<WifiError>,
    pub connect_failures: u32,
    pub address_failures: u32,
    pub disconnect_failures: u32,
    pub bind_failures: u32,
    pub incoming: VecDeque<(Vec<u8>, SocketAddrV4)>,
    pub sent: Vec<(Vec<u8>, SocketAddrV4)>,
    pub calls: Vec<WifiCall>,
    /// Set by a successful `connect`, cleared by `disconnect`
    pub associated: bool,
}

impl Default for ScriptedWifi {
    fn default() -> Self {
        Self {
            mac: MacAddress([0xC4, 0x7F, 0x51, 0x04, 0x0A, 0x1B]),
            address: Ipv4Addr::new(192, 168, 1, 42),
            init_error: None,
            connect_failures: 0,
            address_failures: 0,
            disconnect_failures: 0,
            bind_failures: 0,
            incoming: VecDeque::new(),
            sent: Vec::new(),
            calls: Vec::new(),
            associated: false,
        }
    }
}

impl ScriptedWifi {
    pub fn count(&self, call: &WifiCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    fn consume(counter: &mut u32, error: WifiError) -> Result<(), WifiError> {
        if *counter > 0 {
            *counter -= 1;
            return Err(error);
        }
        Ok(())
    }
}

impl WifiTransport for ScriptedWifi {
    async fn init(&mut self) -> Result<MacAddress, WifiError> {
        self.calls.push(WifiCall::Init);
        match self.init_error {
            Some(e) => Err(e),
            None => Ok(self.mac),
        }
    }

    async fn connect(
        &mut self,
        _ssid: &str,
        _password: &str,
        _security: SecurityMode,
    ) -> Result<(), WifiError> {
        self.calls.push(WifiCall::Connect);
        Self::consume(&mut self.connect_failures, WifiError::Timeout)?;
        self.associated = true;
        Ok(())
    }

    async fn assigned_address(&mut self) -> Result<Ipv4Addr, WifiError> {
        self.calls.push(WifiCall::AssignedAddress);
        if !self.associated {
            return Err(WifiError::NotConnected);
        }
        Self::consume(&mut self.address_failures, WifiError::NoAddress)?;
        Ok(self.address)
    }

    async fn is_connected(&mut self) -> bool {
        self.calls.push(WifiCall::IsConnected);
        self.associated
    }

    async fn start_udp(&mut self, socket: SocketId, local_port: u16) -> Result<(), WifiError> {
        self.calls.push(WifiCall::StartUdp(socket.0, local_port));
        Self::consume(&mut self.bind_failures, WifiError::Rejected)
    }

    async fn send_to(
        &mut self,
        socket: SocketId,
        data: &[u8],
        remote: SocketAddrV4,
        _timeout_ms: u32,
    ) -> Result<usize, WifiError> {
        self.calls.push(WifiCall::SendTo(socket.0, data.len()));
        self.sent.push((data.to_vec(), remote));
        Ok(data.len())
    }

    async fn receive_from(
        &mut self,
        socket: SocketId,
        buf: &mut [u8],
        _timeout_ms: u32,
    ) -> Result<(usize, SocketAddrV4), WifiError> {
        self.calls.push(WifiCall::ReceiveFrom(socket.0));
        let (data, from) = self.incoming.pop_front().ok_or(WifiError::Timeout)?;
        if data.len() > buf.len() {
            return Err(WifiError::BufferTooSmall);
        }
        buf[..data.len()].copy_from_slice(&data);
        Ok((data.len(), from))
    }

    async fn close(&mut self, socket: SocketId) -> Result<(), WifiError> {
        self.calls.push(WifiCall::Close(socket.0));
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), WifiError> {
        self.calls.push(WifiCall::Disconnect);
        Self::consume(&mut self.disconnect_failures, WifiError::Timeout)?;
        self.associated = false;
        Ok(())
    }
}
