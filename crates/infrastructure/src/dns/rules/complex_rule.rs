use fancy_regex::Regex;
use tracing::warn;
use weir_dns_domain::rule::is_regex;
use weir_dns_domain::{glob_match, RuleType};

enum Pattern {
    Regex(Regex),
    Glob(String),
}

/// A wildcard or `/regex/` rule, evaluated against the whole query name.
pub struct ComplexRule {
    text: String,
    rule_type: RuleType,
    pattern: Pattern,
}

impl ComplexRule {
    /// `None` when `text` is a regex that does not compile.
    pub fn new(text: &str, rule_type: RuleType) -> Option<Self> {
        let text = text.trim();

        let pattern = if is_regex(text) {
            let body = &text[1..text.len() - 1];
            match Regex::new(body) {
                Ok(regex) => Pattern::Regex(regex),
                Err(e) => {
                    warn!(rule = text, error = %e, "Skipping rule with invalid regex");
                    return None;
                }
            }
        } else {
            Pattern::Glob(text.to_ascii_lowercase())
        };

        Some(Self {
            text: text.to_string(),
            rule_type,
            pattern,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    pub fn is_match(&self, domain: &str) -> bool {
        let domain = domain.to_ascii_lowercase();
        match &self.pattern {
            Pattern::Glob(glob) => glob_match(glob, &domain),
            // a regex that fails at runtime (backtrack limit) counts as no match
            Pattern::Regex(regex) => regex.is_match(&domain).unwrap_or(false),
        }
    }
}

impl std::fmt::Debug for ComplexRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComplexRule")
            .field("text", &self.text)
            .field("rule_type", &self.rule_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_rule() {
        let rule = ComplexRule::new("a*.*.com", RuleType::Block).unwrap();
        assert!(rule.is_match("ab.ex.com"));
        assert!(rule.is_match("a.b.c.com"));
        assert!(rule.is_match("AB.EX.COM"));
        assert!(!rule.is_match("b.ex.com"));
        assert!(!rule.is_match("ab.ex.org"));
    }

    #[test]
    fn test_regex_rule() {
        let rule = ComplexRule::new("/^r.*\\..*/", RuleType::Allow).unwrap();
        assert!(rule.is_match("ring.com"));
        assert!(rule.is_match("rank.org"));
        assert!(!rule.is_match("argument.com"));
        assert_eq!(rule.rule_type(), RuleType::Allow);
        assert_eq!(rule.text(), "/^r.*\\..*/");
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        assert!(ComplexRule::new("/(unclosed/", RuleType::Block).is_none());
    }
}
