use super::{DnsSource, MultiSource, RequestContext, ResolutionContext, Source, SourceKind};
use crate::dns::message::is_empty_response;
use crate::dns::pool::PoolRegistry;
use async_trait::async_trait;
use hickory_proto::op::Message;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use weir_dns_domain::{normalize_domain, DomainError};

const LOCAL_SERVERS: &[&str] = &["127.0.0.1", "::1", "0.0.0.0", "::"];

/// Nameserver and search settings read from a resolv.conf style file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolvConf {
    pub nameservers: Vec<String>,
    pub search: Vec<String>,
}

impl ResolvConf {
    pub fn parse(content: &str) -> Self {
        let mut conf = Self::default();

        for line in content.lines() {
            let line = line.split(['#', ';']).next().unwrap_or_default();
            let mut tokens = line.split_whitespace();

            match tokens.next() {
                Some("nameserver") => {
                    let Some(server) = tokens.next() else {
                        continue;
                    };
                    // drop an IPv6 zone index such as %eth0
                    let server = server.split('%').next().unwrap_or(server);
                    if server.parse::<IpAddr>().is_err() {
                        warn!(server, "Ignoring nameserver that is not an address");
                        continue;
                    }
                    if !LOCAL_SERVERS.contains(&server) {
                        conf.nameservers.push(server.to_string());
                    }
                }
                Some("search") | Some("domain") => {
                    conf.search = tokens
                        .map(normalize_domain)
                        .filter(|d| !d.is_empty())
                        .collect();
                }
                _ => {}
            }
        }

        conf
    }
}

/// Upstream servers taken from a resolv.conf file, plus its search domains.
pub struct ResolvConfSource {
    path: String,
    search: Vec<String>,
    upstream: Option<Arc<dyn Source>>,
}

impl ResolvConfSource {
    pub fn load(
        path: impl AsRef<Path>,
        registry: Arc<PoolRegistry>,
        backoff: Duration,
    ) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DomainError::IoError(format!("{}: {}", path.display(), e)))?;
        Ok(Self::from_conf(
            path.display().to_string(),
            ResolvConf::parse(&content),
            registry,
            backoff,
        ))
    }

    pub fn from_conf(
        path: impl Into<String>,
        conf: ResolvConf,
        registry: Arc<PoolRegistry>,
        backoff: Duration,
    ) -> Self {
        let path = path.into();

        let mut sources: Vec<Arc<dyn Source>> = Vec::with_capacity(conf.nameservers.len());
        for server in &conf.nameservers {
            match DnsSource::load(server, registry.clone(), backoff) {
                Ok(source) => sources.push(Arc::new(source)),
                Err(e) => warn!(path = %path, server = %server, error = %e, "Skipping nameserver"),
            }
        }

        let upstream: Option<Arc<dyn Source>> = match sources.len() {
            0 => None,
            1 => sources.pop(),
            _ => Some(Arc::new(MultiSource::new(path.clone(), sources))),
        };

        debug!(path = %path, search = ?conf.search, "resolv.conf loaded");
        Self {
            path,
            search: conf.search,
            upstream,
        }
    }
}

#[async_trait]
impl Source for ResolvConfSource {
    fn name(&self) -> String {
        format!("resolv:{}", self.path)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::ResolvConf
    }

    async fn answer(
        &self,
        rcon: &RequestContext,
        ctx: &mut ResolutionContext<'_>,
        request: &Message,
    ) -> Result<Option<Message>, DomainError> {
        let Some(upstream) = &self.upstream else {
            return Ok(None);
        };

        let response = upstream.answer(rcon, ctx, request).await?;
        if !is_empty_response(response.as_ref()) {
            ctx.source_used = Some(self.name());
        }
        Ok(response)
    }

    fn search_domains(&self) -> &[String] {
        &self.search
    }

    async fn close(&self) {
        if let Some(upstream) = &self.upstream {
            upstream.close().await;
        }
    }
}
