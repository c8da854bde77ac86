use crate::filter_list::FilterList;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Tri-state outcome of rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Match {
    #[default]
    None,
    Allow,
    Block,
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Match::None => "none",
            Match::Allow => "allow",
            Match::Block => "block",
        };
        f.write_str(text)
    }
}

/// What a store reports back for one lookup: the decision, the list that
/// produced it and the rule text that matched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RuleMatch {
    pub decision: Match,
    pub list: Option<Arc<FilterList>>,
    pub rule: String,
}

impl RuleMatch {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(decision: Match, list: &Arc<FilterList>, rule: impl Into<String>) -> Self {
        Self {
            decision,
            list: Some(Arc::clone(list)),
            rule: rule.into(),
        }
    }

    /// Allow or block according to the list's own type.
    pub fn from_list(list: &Arc<FilterList>, rule: impl Into<String>) -> Self {
        Self::new(list.list_type.as_match(), list, rule)
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.decision == Match::None
    }

    pub fn list_name(&self) -> Option<&str> {
        self.list.as_deref().map(FilterList::canonical_name)
    }
}
