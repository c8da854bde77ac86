use crate::use_cases::LoadSummary;
use async_trait::async_trait;
use weir_dns_domain::{DomainError, RuleMatch};

/// Application-layer port for the generation-swapping rule engine.
///
/// Reads always see one complete generation. `reload` builds the next
/// generation off to the side and swaps it in.
#[async_trait]
pub trait RuleEnginePort: Send + Sync {
    /// Evaluate `domain` against the named lists of the current generation.
    /// Unknown names are ignored.
    async fn find_match(&self, list_names: &[String], domain: &str) -> RuleMatch;

    /// Build a new generation from the list files and swap it in.
    async fn reload(&self) -> Result<LoadSummary, DomainError>;

    /// Id of the generation currently serving reads.
    fn generation(&self) -> u64;
}
