use super::tcp::{connect_tcp, exchange_framed};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use weir_dns_domain::DomainError;

static CONNECTOR: OnceLock<Result<TlsConnector, String>> = OnceLock::new();

fn connector() -> Result<&'static TlsConnector, DomainError> {
    CONNECTOR
        .get_or_init(|| {
            // another crate may already have installed a process-wide provider
            let provider = CryptoProvider::get_default()
                .cloned()
                .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()));

            let mut roots = RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

            let config = ClientConfig::builder_with_provider(provider)
                .with_safe_default_protocol_versions()
                .map_err(|e| e.to_string())?
                .with_root_certificates(roots)
                .with_no_client_auth();
            Ok(TlsConnector::from(Arc::new(config)))
        })
        .as_ref()
        .map_err(|e| DomainError::TransportError(format!("TLS client setup failed: {}", e)))
}

/// DNS over TLS (RFC 7858) stream.
pub struct TlsConnection {
    stream: TlsStream<TcpStream>,
    server_addr: SocketAddr,
}

impl TlsConnection {
    pub async fn dial(
        server_addr: SocketAddr,
        server_name: &str,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let name = ServerName::try_from(server_name.to_string()).map_err(|e| {
            DomainError::InvalidSourceSpec(format!("Invalid TLS server name '{}': {}", server_name, e))
        })?;

        let tcp = connect_tcp(server_addr, timeout).await?;
        let stream = tokio::time::timeout(timeout, connector()?.connect(name, tcp))
            .await
            .map_err(|_| DomainError::QueryTimeout(format!("TLS handshake with {}", server_addr)))?
            .map_err(|e| {
                DomainError::TransportError(format!("TLS handshake with {} failed: {}", server_addr, e))
            })?;

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
