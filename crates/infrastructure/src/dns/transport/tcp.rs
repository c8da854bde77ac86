use super::message_id;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::debug;
use weir_dns_domain::DomainError;

/// A TCP stream that may serve several queries in sequence.
pub struct TcpConnection {
    stream: TcpStream,
    server_addr: SocketAddr,
}

impl TcpConnection {
    pub async fn dial(server_addr: SocketAddr, timeout: Duration) -> Result<Self, DomainError> {
        let stream = connect_tcp(server_addr, timeout).await?;
        Ok(Self {
            stream,
            server_addr,
        })
    }

    pub async fn exchange(
        &mut self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, DomainError> {
        exchange_framed(&mut self.stream, self.server_addr, message_bytes, timeout).await
    }
}

pub(crate) async fn connect_tcp(
    server_addr: SocketAddr,
    timeout: Duration,
) -> Result<TcpStream, DomainError> {
    let stream = tokio::time::timeout(timeout, TcpStream::connect(server_addr))
        .await
        .map_err(|_| DomainError::QueryTimeout(format!("connecting to {}", server_addr)))?
        .map_err(|e| {
            DomainError::TransportError(format!("Failed to connect to {}: {}", server_addr, e))
        })?;
    let _ = stream.set_nodelay(true);
    Ok(stream)
}

/// Two-byte length prefixed exchange used by TCP and TLS.
pub(crate) async fn exchange_framed<S>(
    stream: &mut S,
    server_addr: SocketAddr,
    message_bytes: &[u8],
    timeout: Duration,
) -> Result<Vec<u8>, DomainError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let length = u16::try_from(message_bytes.len()).map_err(|_| {
        DomainError::TransportError(format!("query of {} bytes is too large", message_bytes.len()))
    })?;
    let deadline = Instant::now() + timeout;
    let io_error = |e: std::io::Error| {
        DomainError::TransportError(format!("Stream to {} failed: {}", server_addr, e))
    };
    let timed_out = |_| DomainError::QueryTimeout(format!("exchange with {}", server_addr));

    let mut frame = Vec::with_capacity(message_bytes.len() + 2);
    frame.extend_from_slice(&length.to_be_bytes());
    frame.extend_from_slice(message_bytes);

    tokio::time::timeout_at(deadline, stream.write_all(&frame))
        .await
        .map_err(timed_out)?
        .map_err(io_error)?;
    tokio::time::timeout_at(deadline, stream.flush())
        .await
        .map_err(timed_out)?
        .map_err(io_error)?;

    let expected_id = message_id(message_bytes);
    loop {
        let mut length_buf = [0u8; 2];
        tokio::time::timeout_at(deadline, stream.read_exact(&mut length_buf))
            .await
            .map_err(timed_out)?
            .map_err(io_error)?;

        let mut response = vec![0u8; u16::from_be_bytes(length_buf) as usize];
        tokio::time::timeout_at(deadline, stream.read_exact(&mut response))
            .await
            .map_err(timed_out)?
            .map_err(io_error)?;

        if message_id(&response) == expected_id {
            debug!(server = %server_addr, bytes_received = response.len(), "Stream response received");
            return Ok(response);
        }
    }
}
