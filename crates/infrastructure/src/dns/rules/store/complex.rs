use super::allow_then_block;
use crate::dns::rules::complex_rule::ComplexRule;
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;
use weir_dns_application::ports::RuleStore;
use weir_dns_domain::{is_complex, DomainError, FilterList, Match, RuleMatch, RuleType};

type RulesByList = FxHashMap<String, Vec<ComplexRule>>;

/// Keeps wildcard and regex rules to itself and hands every plain rule to
/// the wrapped backend.
///
/// Precedence, first hit wins: complex allow rules, an allow from the
/// backend, complex block rules, then whatever the backend said.
pub struct ComplexStore {
    backend: Box<dyn RuleStore>,
    rules: FxHashMap<RuleType, RulesByList>,
}

impl ComplexStore {
    pub fn new(backend: Box<dyn RuleStore>) -> Self {
        Self {
            backend,
            rules: FxHashMap::default(),
        }
    }

    /// Complex rules held for one list.
    pub fn complex_count(&self, list: &FilterList) -> usize {
        self.rules
            .get(&list.list_type)
            .and_then(|by_list| by_list.get(list.canonical_name()))
            .map_or(0, Vec::len)
    }

    fn first_complex(
        &self,
        rule_type: RuleType,
        lists: &[Arc<FilterList>],
        domain: &str,
    ) -> Option<RuleMatch> {
        let by_list = self.rules.get(&rule_type)?;
        allow_then_block(lists)
            .into_iter()
            .filter(|list| list.list_type == rule_type)
            .find_map(|list| {
                by_list
                    .get(list.canonical_name())?
                    .iter()
                    .find(|rule| rule.is_match(domain))
                    .map(|rule| RuleMatch::new(rule.rule_type().as_match(), list, rule.text()))
            })
    }
}

#[async_trait]
impl RuleStore for ComplexStore {
    async fn init(
        &mut self,
        session_root: &Path,
        lists: &[Arc<FilterList>],
    ) -> Result<(), DomainError> {
        self.rules.clear();
        self.backend.init(session_root, lists).await
    }

    async fn clear(&mut self, list: &FilterList) -> Result<(), DomainError> {
        if let Some(by_list) = self.rules.get_mut(&list.list_type) {
            by_list.remove(list.canonical_name());
        }
        self.backend.clear(list).await
    }

    async fn load(&mut self, list: &FilterList, rule: &str) -> Result<(), DomainError> {
        if !is_complex(rule) {
            return self.backend.load(list, rule).await;
        }

        // an unusable pattern is logged by the constructor and skipped
        if let Some(complex) = ComplexRule::new(rule, list.list_type) {
            self.rules
                .entry(list.list_type)
                .or_default()
                .entry(list.canonical_name().to_string())
                .or_default()
                .push(complex);
        }
        Ok(())
    }

    async fn finalize(
        &mut self,
        session_root: &Path,
        lists: &[Arc<FilterList>],
    ) -> Result<(), DomainError> {
        self.backend.finalize(session_root, lists).await
    }

    async fn find_match(&self, lists: &[Arc<FilterList>], domain: &str) -> RuleMatch {
        if let Some(allowed) = self.first_complex(RuleType::Allow, lists, domain) {
            return allowed;
        }

        let backend = self.backend.find_match(lists, domain).await;
        if backend.decision == Match::Allow {
            return backend;
        }

        self.first_complex(RuleType::Block, lists, domain)
            .unwrap_or(backend)
    }

    async fn close(&mut self) {
        self.rules.clear();
        self.backend.close().await;
    }

    fn kind(&self) -> &'static str {
        self.backend.kind()
    }
}
