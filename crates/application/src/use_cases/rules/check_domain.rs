use crate::ports::RuleEnginePort;
use std::sync::Arc;
use weir_dns_domain::{normalize_domain, RuleMatch};

/// Decide allow/block/none for a query name against a consumer's lists.
pub struct CheckDomainUseCase {
    engine: Arc<dyn RuleEnginePort>,
}

impl CheckDomainUseCase {
    pub fn new(engine: Arc<dyn RuleEnginePort>) -> Self {
        Self { engine }
    }

    pub async fn execute(&self, list_names: &[String], query_name: &str) -> RuleMatch {
        let domain = normalize_domain(query_name);
        if domain.is_empty() || list_names.is_empty() {
            return RuleMatch::none();
        }
        self.engine.find_match(list_names, &domain).await
    }
}
