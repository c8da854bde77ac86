use crate::domain_name::trim_comments;
use crate::rule_match::Match;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

const WILDCARD: char = '*';
const REGEX_DELIMITER: char = '/';

/// Names that hosts-format lists map to themselves and that must never be
/// treated as rules.
const HOSTS_SELF_ENTRIES: &[&str] = &[
    "localhost",
    "localhost.localdomain",
    "local",
    "broadcasthost",
    "0.0.0.0",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    Allow,
    #[default]
    Block,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Allow => "allow",
            RuleType::Block => "block",
        }
    }

    pub fn as_match(&self) -> Match {
        match self {
            RuleType::Allow => Match::Allow,
            RuleType::Block => Match::Block,
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" | "allowlist" | "whitelist" => Ok(RuleType::Allow),
            "" | "block" | "blocklist" | "blacklist" => Ok(RuleType::Block),
            other => Err(format!("unknown list type '{}'", other)),
        }
    }
}

/// One parsed list line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    text: String,
    rule_type: RuleType,
    complex: bool,
}

impl Rule {
    pub fn new(text: impl Into<String>, rule_type: RuleType) -> Self {
        let text = text.into();
        let complex = is_complex(&text);
        Self {
            text,
            rule_type,
            complex,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    pub fn is_complex(&self) -> bool {
        self.complex
    }
}

/// Turn a raw list line into rule text.
///
/// Comments are removed, and of the remaining whitespace separated tokens the
/// last one is kept, which drops the address column of hosts-format lines.
pub fn parse_line(line: &str) -> Option<String> {
    let line = trim_comments(line).trim();
    if line.is_empty() {
        return None;
    }

    let mut tokens = line.split_whitespace();
    let first = tokens.next()?;
    let rule = tokens.last().unwrap_or(first);

    // a lone address is not a rule
    if rule.parse::<IpAddr>().is_ok() {
        return None;
    }

    let rule = rule.to_ascii_lowercase();
    if HOSTS_SELF_ENTRIES.contains(&rule.as_str()) || rule.starts_with("ip6-") {
        return None;
    }

    Some(rule)
}

/// Wildcard (`*`) and `/regex/` rules need pattern evaluation.
pub fn is_complex(text: &str) -> bool {
    text.contains(WILDCARD) || is_regex(text)
}

pub fn is_regex(text: &str) -> bool {
    text.len() > 1 && text.starts_with(REGEX_DELIMITER) && text.ends_with(REGEX_DELIMITER)
}
