use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use weir_dns_domain::{DomainError, FilterList, RuleMatch};

/// Pluggable domain-membership backend.
///
/// A store is built once per generation: `init`, any number of `load` calls,
/// then `finalize`. After that it is only read through `find_match` until the
/// generation is dropped and `close` releases its resources. The mutating
/// calls take `&mut self`, so a store that is being built can never be read
/// concurrently.
///
/// Lists are identified by [`FilterList::canonical_name`]. `find_match`
/// returns the `Arc` passed in `lists` for whichever list matched.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Allocate per-list structures. `session_root` is a directory owned by
    /// this generation; on-disk backends put their files there.
    async fn init(
        &mut self,
        session_root: &Path,
        lists: &[Arc<FilterList>],
    ) -> Result<(), DomainError>;

    /// Drop everything loaded for one list.
    async fn clear(&mut self, list: &FilterList) -> Result<(), DomainError>;

    /// Ingest one parsed rule. Loading the same rule twice is harmless.
    async fn load(&mut self, list: &FilterList, rule: &str) -> Result<(), DomainError>;

    /// Bulk post-processing after the last `load`.
    async fn finalize(
        &mut self,
        session_root: &Path,
        lists: &[Arc<FilterList>],
    ) -> Result<(), DomainError>;

    /// Allow lists first, then block lists, each checked against the whole
    /// domain hierarchy. Backend failures are logged and read as no match.
    async fn find_match(&self, lists: &[Arc<FilterList>], domain: &str) -> RuleMatch;

    async fn close(&mut self);

    /// Short backend label for logs.
    fn kind(&self) -> &'static str;
}
