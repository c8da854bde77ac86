use super::message_id;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, warn};
use weir_dns_domain::DomainError;

/// Maximum UDP DNS response size with EDNS(0)
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

/// A socket connected to one upstream. Not reused across queries.
pub struct UdpConnection {
    socket: UdpSocket,
    server_addr: SocketAddr,
}

impl UdpConnection {
    pub async fn dial(server_addr: SocketAddr) -> Result<Self, DomainError> {
        // Bind to ephemeral port (0 = OS assigns)
        let bind_addr: SocketAddr = if server_addr.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };

        let socket = UdpSocket::bind(bind_addr).await.map_err(|e| {
            DomainError::TransportError(format!("Failed to bind UDP socket: {}", e))
        })?;
        socket.connect(server_addr).await.map_err(|e| {
            DomainError::TransportError(format!("Failed to connect UDP socket to {}: {}", server_addr, e))
        })?;

        Ok(Self {
            socket,
            server_addr,
        })
    }

    pub async fn exchange(
        &mut self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, DomainError> {
        let deadline = Instant::now() + timeout;

        let bytes_sent = tokio::time::timeout_at(deadline, self.socket.send(message_bytes))
            .await
            .map_err(|_| {
                DomainError::QueryTimeout(format!("sending UDP query to {}", self.server_addr))
            })?
            .map_err(|e| {
                DomainError::TransportError(format!(
                    "Failed to send UDP query to {}: {}",
                    self.server_addr, e
                ))
            })?;

        debug!(server = %self.server_addr, bytes_sent, "UDP query sent");

        let expected_id = message_id(message_bytes);
        let mut recv_buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];

        // Stray datagrams (late answers to an earlier query) are skipped
        // until the deadline.
        loop {
            let bytes_received = tokio::time::timeout_at(deadline, self.socket.recv(&mut recv_buf))
                .await
                .map_err(|_| {
                    DomainError::QueryTimeout(format!(
                        "waiting for UDP response from {}",
                        self.server_addr
                    ))
                })?
                .map_err(|e| {
                    DomainError::TransportError(format!(
                        "Failed to receive UDP response from {}: {}",
                        self.server_addr, e
                    ))
                })?;

            if message_id(&recv_buf[..bytes_received]) == expected_id {
                recv_buf.truncate(bytes_received);
                debug!(server = %self.server_addr, bytes_received, "UDP response received");
                return Ok(recv_buf);
            }

            warn!(
                server = %self.server_addr,
                bytes_received,
                "Discarding UDP response with mismatched id"
            );
        }
    }
}
