use super::{RequestContext, ResolutionContext, Source, SourceKind};
use crate::dns::message::is_empty_response;
use crate::dns::pool::PoolRegistry;
use crate::dns::transport::Protocol;
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use hickory_proto::op::Message;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::debug;
use weir_dns_domain::DomainError;

pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(15);

/// Parsed form of `host[:port][/udp|/tcp|/tcp-tls]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsSpec {
    pub host: String,
    pub port: u16,
    pub protocol: Option<Protocol>,
}

impl DnsSpec {
    pub fn parse(spec: &str) -> Result<Self, DomainError> {
        let invalid = || DomainError::InvalidSourceSpec(spec.to_string());
        let spec = spec.trim();

        let (endpoint, protocol) = match spec.rsplit_once('/') {
            Some((endpoint, suffix)) => (
                endpoint,
                Some(Protocol::from_suffix(suffix).ok_or_else(invalid)?),
            ),
            None => (spec, None),
        };

        let (host, port) = if let Some(rest) = endpoint.strip_prefix('[') {
            let (host, after) = rest.split_once(']').ok_or_else(invalid)?;
            let port = match after.strip_prefix(':') {
                Some(port) => Some(port.parse::<u16>().map_err(|_| invalid())?),
                None if after.is_empty() => None,
                None => return Err(invalid()),
            };
            (host, port)
        } else if endpoint.parse::<IpAddr>().is_ok() {
            (endpoint, None)
        } else if let Some((host, port)) = endpoint.rsplit_once(':') {
            (host, Some(port.parse::<u16>().map_err(|_| invalid())?))
        } else {
            (endpoint, None)
        };

        if host.is_empty() {
            return Err(invalid());
        }

        let port = port
            .filter(|p| *p != 0)
            .unwrap_or_else(|| protocol.unwrap_or_default().default_port());

        Ok(Self {
            host: host.to_string(),
            port,
            protocol,
        })
    }

    /// `host:port`, with brackets around IPv6 hosts.
    pub fn endpoint(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Forwards the request to one upstream server.
pub struct DnsSource {
    spec: DnsSpec,
    address: OnceCell<SocketAddr>,
    registry: Arc<PoolRegistry>,
    backoff: Duration,
    backoff_until: ArcSwapOption<Instant>,
}

impl DnsSource {
    pub fn load(spec: &str, registry: Arc<PoolRegistry>, backoff: Duration) -> Result<Self, DomainError> {
        let spec = DnsSpec::parse(spec)?;
        let address = OnceCell::new();
        if let Ok(ip) = spec.host.parse::<IpAddr>() {
            let _ = address.set(SocketAddr::new(ip, spec.port));
        }

        Ok(Self {
            spec,
            address,
            registry,
            backoff,
            backoff_until: ArcSwapOption::empty(),
        })
    }

    pub fn spec(&self) -> &DnsSpec {
        &self.spec
    }

    pub fn is_backing_off(&self) -> bool {
        self.backoff_until
            .load()
            .as_deref()
            .is_some_and(|until| Instant::now() < *until)
    }

    async fn address(&self) -> Result<SocketAddr, DomainError> {
        self.address
            .get_or_try_init(|| async {
                tokio::net::lookup_host((self.spec.host.as_str(), self.spec.port))
                    .await?
                    .next()
                    .ok_or_else(|| DomainError::NotFound(self.spec.host.clone()))
            })
            .await
            .copied()
    }

    fn start_backoff(&self) {
        self.backoff_until
            .store(Some(Arc::new(Instant::now() + self.backoff)));
    }
}

#[async_trait]
impl Source for DnsSource {
    fn name(&self) -> String {
        match self.spec.protocol {
            Some(protocol) => format!("{}/{}", self.spec.endpoint(), protocol),
            None => self.spec.endpoint(),
        }
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Dns
    }

    async fn answer(
        &self,
        rcon: &RequestContext,
        ctx: &mut ResolutionContext<'_>,
        request: &Message,
    ) -> Result<Option<Message>, DomainError> {
        if self.is_backing_off() || !request.recursion_desired() {
            return Ok(None);
        }

        let protocol = self.spec.protocol.unwrap_or(rcon.protocol);
        let address = self.address().await?;
        let pool = self.registry.pool(protocol, address, &self.spec.host);

        let query_bytes = request
            .to_vec()
            .map_err(|e| DomainError::InvalidDnsResponse(e.to_string()))?;

        let response_bytes = match pool.exchange(&query_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(
                    server = %address,
                    protocol = %protocol,
                    backoff_secs = self.backoff.as_secs(),
                    error = %e,
                    "Upstream failed, backing off"
                );
                self.start_backoff();
                return Err(e);
            }
        };

        let mut response = Message::from_vec(&response_bytes)
            .map_err(|e| DomainError::InvalidDnsResponse(e.to_string()))?;
        response.set_id(request.id());

        if !is_empty_response(Some(&response)) {
            ctx.set_source_used_if_unset(format!("{}/{}", self.spec.endpoint(), protocol));
        }

        Ok(Some(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_ip() {
        let spec = DnsSpec::parse("8.8.8.8").unwrap();
        assert_eq!(spec.host, "8.8.8.8");
        assert_eq!(spec.port, 53);
        assert_eq!(spec.protocol, None);
    }

    #[test]
    fn test_parse_port_and_protocol() {
        let spec = DnsSpec::parse("127.0.0.1:5354/tcp").unwrap();
        assert_eq!(spec.port, 5354);
        assert_eq!(spec.protocol, Some(Protocol::Tcp));

        let tls = DnsSpec::parse("1.1.1.1/tcp-tls").unwrap();
        assert_eq!(tls.port, 853);
        assert_eq!(tls.endpoint(), "1.1.1.1:853");
    }

    #[test]
    fn test_parse_ipv6() {
        let bare = DnsSpec::parse("2001:4860:4860::8888").unwrap();
        assert_eq!(bare.host, "2001:4860:4860::8888");
        assert_eq!(bare.endpoint(), "[2001:4860:4860::8888]:53");

        let bracketed = DnsSpec::parse("[::1]:5300/udp").unwrap();
        assert_eq!(bracketed.host, "::1");
        assert_eq!(bracketed.port, 5300);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(DnsSpec::parse("8.8.8.8/quic").is_err());
        assert!(DnsSpec::parse("dns.example:notaport").is_err());
        assert!(DnsSpec::parse(":53").is_err());
    }

    #[test]
    fn test_name_reflects_protocol() {
        let registry = Arc::new(PoolRegistry::default());
        let fixed = DnsSource::load("9.9.9.9/tcp", registry.clone(), DEFAULT_BACKOFF).unwrap();
        assert_eq!(fixed.name(), "9.9.9.9:53/tcp");

        let follow = DnsSource::load("9.9.9.9", registry, DEFAULT_BACKOFF).unwrap();
        assert_eq!(follow.name(), "9.9.9.9:53");
    }

    #[tokio::test]
    async fn test_no_recursion_desired_is_skipped() {
        let registry = Arc::new(PoolRegistry::default());
        let source = DnsSource::load("127.0.0.1:9", registry, DEFAULT_BACKOFF).unwrap();
        let request = Message::new();

        let mut ctx = ResolutionContext::new();
        let result = source
            .answer(&RequestContext::default(), &mut ctx, &request)
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(registry_untouched(&source));
    }

    fn registry_untouched(source: &DnsSource) -> bool {
        source.registry.is_empty()
    }
}
