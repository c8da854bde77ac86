use weir_dns_domain::{glob_match, normalize_domain};

/// Decides which query names a resolver is willing to answer.
///
/// An entry matches the domain itself and every subdomain of it; entries
/// containing `*` are glob patterns. No entries means every name matches.
#[derive(Debug, Clone, Default)]
pub struct DomainFilter {
    entries: Vec<String>,
}

impl DomainFilter {
    pub fn new(domains: &[String]) -> Self {
        Self {
            entries: domains
                .iter()
                .map(|d| normalize_domain(d))
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn matches(&self, query_name: &str) -> bool {
        if self.entries.is_empty() {
            return true;
        }

        let name = normalize_domain(query_name);
        self.entries.iter().any(|entry| {
            if entry.contains('*') {
                glob_match(entry, &name)
            } else {
                name == *entry
                    || (name.len() > entry.len()
                        && name.ends_with(entry.as_str())
                        && name.as_bytes()[name.len() - entry.len() - 1] == b'.')
            }
        })
    }
}
