//! UDP socket on top of a Wi-Fi transport

use core::net::SocketAddrV4;

use embedded_hal_async::delay::DelayNs;
use hal_abstractions::{SocketId, WifiError, WifiTransport};

use crate::config::RetryPolicy;

/// Bound UDP socket borrowing the transport
///
/// Dropping the socket leaves it open on the module; call
/// [`close`](Self::close) to release it.
pub struct UdpSocket<'a, W: WifiTransport> {
    transport: &'a mut W,
    id: SocketId,
    local_port: u16,
}

impl<'a, W: WifiTransport> UdpSocket<'a, W> {
    /// Bind `socket` to `local_port`, retrying per `policy`
    ///
    /// Each failed attempt is followed by `policy.delay_ms` of sleep, except
    /// the last one. Exhausting the attempts yields [`WifiError::BindFailed`].
    pub async fn bind<D: DelayNs>(
        transport: &'a mut W,
        delay: &mut D,
        id: SocketId,
        local_port: u16,
        policy: RetryPolicy,
    ) -> Result<Self, WifiError> {
        info!("Trying to bind socket {} on port {}", id.0, local_port);

        for attempt in 1..=policy.attempts {
            match transport.start_udp(id, local_port).await {
                Ok(()) => {
                    info!("Socket {} bound after {} attempt(s)", id.0, attempt);
                    return Ok(Self {
                        transport,
                        id,
                        local_port,
                    });
                }
                Err(e) => {
                    debug!("Bind attempt {} failed: {}", attempt, e);
                    if attempt < policy.attempts {
                        delay.delay_ms(policy.delay_ms).await;
                    }
                }
            }
        }

        warn!("Could not bind socket {} on port {}", id.0, local_port);
        Err(WifiError::BindFailed)
    }

    pub fn id(&self) -> SocketId {
        self.id
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Send one datagram; returns the number of bytes the module accepted
    pub async fn send_to(
        &mut self,
        data: &[u8],
        remote: SocketAddrV4,
        timeout_ms: u32,
    ) -> Result<usize, WifiError> {
        let sent = self
            .transport
            .send_to(self.id, data, remote, timeout_ms)
            .await?;
        if sent != data.len() {
            warn!("UDP send: expected {}, sent {}", data.len(), sent);
        }
        Ok(sent)
    }

    /// Receive one datagram, waiting at most `timeout_ms`
    pub async fn receive_from(
        &mut self,
        buf: &mut [u8],
        timeout_ms: u32,
    ) -> Result<(usize, SocketAddrV4), WifiError> {
        self.transport.receive_from(self.id, buf, timeout_ms).await
    }

    pub async fn close(self) -> Result<(), WifiError> {
        self.transport.close(self.id).await
    }
}
