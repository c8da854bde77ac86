pub mod cache;
pub mod message;
pub mod pool;
pub mod release;
pub mod resolver;
pub mod rules;
pub mod source;
pub mod transport;

pub use cache::{CacheMetrics, DnsCache};
pub use message::is_empty_response;
pub use pool::{ConnectionPool, PoolRegistry};
pub use release::wait_for_release;
pub use resolver::{ReloadableResolverMap, ResolutionResult, Resolver, ResolverMap};
pub use rules::{create_store, RuleEngine, StoreKind};
pub use source::{RequestContext, ResolutionContext, Source, SourceKind};
pub use transport::Protocol;
