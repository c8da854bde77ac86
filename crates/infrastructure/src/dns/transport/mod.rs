pub mod tcp;
#[cfg(feature = "dns-over-rustls")]
pub mod tls;
pub mod udp;

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use weir_dns_domain::DomainError;

/// Wire protocol of an upstream, selected by the `/udp`, `/tcp` or
/// `/tcp-tls` suffix of a source specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Protocol {
    #[default]
    Udp,
    Tcp,
    Tls,
}

impl Protocol {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix.trim().to_ascii_lowercase().as_str() {
            "udp" => Some(Protocol::Udp),
            "tcp" => Some(Protocol::Tcp),
            "tcp-tls" | "tls" | "dot" => Some(Protocol::Tls),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Udp => "udp",
            Protocol::Tcp => "tcp",
            Protocol::Tls => "tcp-tls",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Tls => 853,
            Protocol::Udp | Protocol::Tcp => 53,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An open upstream connection, dispatched by enum rather than trait object.
pub enum Connection {
    Udp(udp::UdpConnection),
    Tcp(tcp::TcpConnection),
    #[cfg(feature = "dns-over-rustls")]
    Tls(tls::TlsConnection),
}

impl Connection {
    /// Open a connection; `server_name` is only used for TLS verification.
    pub async fn dial(
        protocol: Protocol,
        address: SocketAddr,
        server_name: &str,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        match protocol {
            Protocol::Udp => Ok(Self::Udp(udp::UdpConnection::dial(address).await?)),
            Protocol::Tcp => Ok(Self::Tcp(
                tcp::TcpConnection::dial(address, timeout).await?,
            )),
            #[cfg(feature = "dns-over-rustls")]
            Protocol::Tls => Ok(Self::Tls(
                tls::TlsConnection::dial(address, server_name, timeout).await?,
            )),
            #[cfg(not(feature = "dns-over-rustls"))]
            Protocol::Tls => {
                let _ = server_name;
                tracing::warn!(server = %address, "TLS feature not enabled, falling back to TCP");
                Ok(Self::Tcp(tcp::TcpConnection::dial(address, timeout).await?))
            }
        }
    }

    /// Send one wire-format query and wait for the matching response.
    pub async fn exchange(
        &mut self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, DomainError> {
        match self {
            Self::Udp(c) => c.exchange(message_bytes, timeout).await,
            Self::Tcp(c) => c.exchange(message_bytes, timeout).await,
            #[cfg(feature = "dns-over-rustls")]
            Self::Tls(c) => c.exchange(message_bytes, timeout).await,
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            Self::Udp(_) => Protocol::Udp,
            Self::Tcp(_) => Protocol::Tcp,
            #[cfg(feature = "dns-over-rustls")]
            Self::Tls(_) => Protocol::Tls,
        }
    }

    /// Stream connections go back to the pool; UDP sockets are not kept.
    pub fn is_reusable(&self) -> bool {
        !matches!(self, Self::Udp(_))
    }
}

/// First two bytes of a DNS message.
#[inline]
pub(crate) fn message_id(bytes: &[u8]) -> Option<u16> {
    (bytes.len() >= 2).then(|| u16::from_be_bytes([bytes[0], bytes[1]]))
}
