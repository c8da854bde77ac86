pub mod context;
pub mod dns;
pub mod factory;
pub mod hostfile;
pub mod load_balanced;
pub mod multi;
pub mod resolv_conf;
pub mod resolver_ref;
pub mod system;
pub mod zone;

pub use context::{RequestContext, ResolutionContext};
pub use dns::DnsSource;
pub use factory::{create_source, SourceFactory};
pub use hostfile::HostFileSource;
pub use load_balanced::LoadBalancedSource;
pub use multi::MultiSource;
pub use resolv_conf::ResolvConfSource;
pub use resolver_ref::ResolverRefSource;
pub use system::SystemSource;
pub use zone::ZoneSource;

use async_trait::async_trait;
use hickory_proto::op::Message;
use std::fmt;
use weir_dns_domain::DomainError;

/// TTL for records synthesized from the operating system resolver.
pub const SYNTHESIZED_TTL: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Dns,
    HostFile,
    Zone,
    System,
    ResolverRef,
    Multi,
    LoadBalanced,
    ResolvConf,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Dns => "dns",
            SourceKind::HostFile => "hostfile",
            SourceKind::Zone => "zone",
            SourceKind::System => "system",
            SourceKind::ResolverRef => "resolver",
            SourceKind::Multi => "multi",
            SourceKind::LoadBalanced => "lb",
            SourceKind::ResolvConf => "resolv",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that can answer a DNS question.
///
/// `Ok(None)` and an empty response both mean "not answered here" and make
/// the caller move on to the next source. `Err` is reserved for transport
/// and resolution failures.
#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> String;

    fn kind(&self) -> SourceKind;

    async fn answer(
        &self,
        rcon: &RequestContext,
        ctx: &mut ResolutionContext<'_>,
        request: &Message,
    ) -> Result<Option<Message>, DomainError>;

    /// Search suffixes this source contributes to its resolver.
    fn search_domains(&self) -> &[String] {
        &[]
    }

    async fn close(&self) {}
}
