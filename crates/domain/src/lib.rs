//! Weir DNS Domain Layer
pub mod config;
pub mod domain_name;
pub mod errors;
pub mod filter_list;
pub mod glob;
pub mod rule;
pub mod rule_match;

pub use config::{Config, ConfigError};
pub use domain_name::{domain_hierarchy, normalize_domain, DomainHierarchy};
pub use errors::DomainError;
pub use filter_list::FilterList;
pub use glob::glob_match;
pub use rule::{is_complex, parse_line, Rule, RuleType};
pub use rule_match::{Match, RuleMatch};
