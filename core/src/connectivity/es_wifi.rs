//! Inventek ES-WiFi (ISM43362) AT command client
//!
//! Every command is one text line terminated by `\r`, optionally followed by
//! a binary payload. A successful reply is `\r\n<body>\r\nOK\r\n> `; a reply
//! carrying `ERROR` is a rejection. Bus framing is the job of the
//! [`AtTransport`] implementation.

use core::fmt::Write as _;
use core::net::{Ipv4Addr, SocketAddrV4};

use hal_abstractions::{
    AtTransport, MacAddress, SecurityMode, SocketId, WifiError, WifiTransport,
};
use heapless::String;

/// Largest datagram the module accepts per send or receive
pub const MAX_PAYLOAD: usize = 1460;

const RESPONSE_LEN: usize = MAX_PAYLOAD + 64;
const COMMAND_LEN: usize = 96;
const OK_PROMPT: &[u8] = b"\r\nOK\r\n> ";
const ERROR_MARK: &[u8] = b"ERROR";

/// Socket protocol code for UDP
const PROTOCOL_UDP: u8 = 1;

/// ES-WiFi module driven over an [`AtTransport`]
pub struct EsWifi<T> {
    at: T,
    response: [u8; RESPONSE_LEN],
    initialized: bool,
}

impl<T: AtTransport> EsWifi<T> {
    pub fn new(at: T) -> Self {
        Self {
            at,
            response: [0; RESPONSE_LEN],
            initialized: false,
        }
    }

    pub fn release(self) -> T {
        self.at
    }

    fn require_init(&self) -> Result<(), WifiError> {
        if self.initialized {
            Ok(())
        } else {
            Err(WifiError::NotInitialized)
        }
    }

    async fn command(&mut self, args: core::fmt::Arguments<'_>) -> Result<&[u8], WifiError> {
        self.command_with_payload(args, &[]).await
    }

    async fn command_with_payload(
        &mut self,
        args: core::fmt::Arguments<'_>,
        payload: &[u8],
    ) -> Result<&[u8], WifiError> {
        let mut line: String<COMMAND_LEN> = String::new();
        line.write_fmt(args).map_err(|_| WifiError::BufferTooSmall)?;
        line.push('\r').map_err(|_| WifiError::BufferTooSmall)?;

        trace!("AT > {=str}", line.as_str());
        let n = self
            .at
            .exchange(line.as_bytes(), payload, &mut self.response)
            .await?;
        let reply = self.response.get(..n).ok_or(WifiError::BufferTooSmall)?;
        parse_body(reply)
    }

    async fn select_socket(&mut self, socket: SocketId) -> Result<(), WifiError> {
        self.command(format_args!("P0={}", socket.0)).await?;
        Ok(())
    }
}

/// Strip the framing from a reply
fn parse_body(reply: &[u8]) -> Result<&[u8], WifiError> {
    if let Some(body) = reply.strip_suffix(OK_PROMPT) {
        return Ok(body.strip_prefix(b"\r\n").unwrap_or(body));
    }
    if reply.windows(ERROR_MARK.len()).any(|w| w == ERROR_MARK) {
        return Err(WifiError::Rejected);
    }
    Err(WifiError::InvalidResponse)
}

fn text(body: &[u8]) -> Result<&str, WifiError> {
    core::str::from_utf8(body)
        .map(str::trim)
        .map_err(|_| WifiError::InvalidResponse)
}

fn parse_mac(text: &str) -> Result<MacAddress, WifiError> {
    let mut mac = [0u8; 6];
    let mut parts = text.split(':');
    for byte in mac.iter_mut() {
        let part = parts.next().ok_or(WifiError::InvalidResponse)?;
        *byte = u8::from_str_radix(part.trim(), 16).map_err(|_| WifiError::InvalidResponse)?;
    }
    if parts.next().is_some() {
        return Err(WifiError::InvalidResponse);
    }
    Ok(MacAddress(mac))
}

fn csv_field(text: &str, index: usize) -> Result<&str, WifiError> {
    text.split(',')
        .nth(index)
        .map(str::trim)
        .ok_or(WifiError::InvalidResponse)
}

fn parse_ip(field: &str) -> Result<Ipv4Addr, WifiError> {
    field.parse().map_err(|_| WifiError::InvalidResponse)
}

/// Byte count in an `S3` reply; an empty body means all of `requested`
fn sent_count(body: &str, requested: usize) -> Result<usize, WifiError> {
    match body {
        "" => Ok(requested),
        "-1" => Err(WifiError::Rejected),
        count => count.parse().map_err(|_| WifiError::InvalidResponse),
    }
}

impl<T: AtTransport> WifiTransport for EsWifi<T> {
    async fn init(&mut self) -> Result<MacAddress, WifiError> {
        self.initialized = false;
        self.at.reset().await?;

        let body = self.command(format_args!("Z5")).await?;
        let mac = parse_mac(text(body)?)?;
        self.initialized = true;
        Ok(mac)
    }

    async fn connect(
        &mut self,
        ssid: &str,
        password: &str,
        security: SecurityMode,
    ) -> Result<(), WifiError> {
        self.require_init()?;
        self.command(format_args!("C1={}", ssid)).await?;
        self.command(format_args!("C2={}", password)).await?;
        self.command(format_args!("C3={}", security.code())).await?;
        // DHCP on
        self.command(format_args!("C4=1")).await?;
        self.command(format_args!("C0")).await?;
        Ok(())
    }

    /// Reads the network settings; the address is the sixth field
    async fn assigned_address(&mut self) -> Result<Ipv4Addr, WifiError> {
        self.require_init()?;
        let body = self.command(format_args!("C?")).await?;
        parse_ip(csv_field(text(body)?, 5)?)
    }

    async fn is_connected(&mut self) -> bool {
        if self.require_init().is_err() {
            return false;
        }
        match self.command(format_args!("CS")).await {
            Ok(body) => text(body).map(|t| t == "1").unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn start_udp(&mut self, socket: SocketId, local_port: u16) -> Result<(), WifiError> {
        self.require_init()?;
        self.select_socket(socket).await?;
        self.command(format_args!("P1={}", PROTOCOL_UDP)).await?;
        self.command(format_args!("P2={}", local_port)).await?;
        self.command(format_args!("P3=0.0.0.0")).await?;
        self.command(format_args!("P4={}", local_port)).await?;
        self.command(format_args!("P6=1")).await?;
        Ok(())
    }

    async fn send_to(
        &mut self,
        socket: SocketId,
        data: &[u8],
        remote: SocketAddrV4,
        timeout_ms: u32,
    ) -> Result<usize, WifiError> {
        self.require_init()?;
        if data.len() > MAX_PAYLOAD {
            return Err(WifiError::BufferTooSmall);
        }
        self.select_socket(socket).await?;
        self.command(format_args!("P3={}", remote.ip())).await?;
        self.command(format_args!("P4={}", remote.port())).await?;
        self.command(format_args!("S2={}", timeout_ms)).await?;
        let body = self.command_with_payload(format_args!("S3={}", data.len()), data).await?;
        sent_count(text(body)?, data.len())
    }

    /// Reads one datagram, then the socket info for the sender
    ///
    /// `P?` is expected as `protocol,local ip,local port,remote ip,remote port,...`.
    async fn receive_from(
        &mut self,
        socket: SocketId,
        buf: &mut [u8],
        timeout_ms: u32,
    ) -> Result<(usize, SocketAddrV4), WifiError> {
        self.require_init()?;
        self.select_socket(socket).await?;
        self.command(format_args!("R1={}", buf.len().min(MAX_PAYLOAD))).await?;
        self.command(format_args!("R2={}", timeout_ms)).await?;

        let data = self.command(format_args!("R0")).await?;
        if data.is_empty() {
            return Err(WifiError::Timeout);
        }
        let n = data.len();
        buf.get_mut(..n)
            .ok_or(WifiError::BufferTooSmall)?
            .copy_from_slice(data);

        let info = text(self.command(format_args!("P?")).await?)?;
        let ip = parse_ip(csv_field(info, 3)?)?;
        let port = csv_field(info, 4)?
            .parse()
            .map_err(|_| WifiError::InvalidResponse)?;
        Ok((n, SocketAddrV4::new(ip, port)))
    }

    async fn close(&mut self, socket: SocketId) -> Result<(), WifiError> {
        self.require_init()?;
        self.select_socket(socket).await?;
        self.command(format_args!("P6=0")).await?;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), WifiError> {
        self.require_init()?;
        self.command(format_args!("CD")).await?;
        Ok(())
    }
}
