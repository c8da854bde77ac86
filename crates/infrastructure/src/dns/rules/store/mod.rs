//! Rule store backends.
//!
//! Every backend answers the same question: does any rule of the given
//! lists equal the domain or one of its parents. Allow lists are consulted
//! before block lists, and the first hit wins.

pub mod bloom;
pub mod complex;
pub mod hash32;
pub mod hash64;
pub mod memory;
pub mod radix;
mod radix_tree;
pub mod sqlite;

pub use bloom::BloomStore;
pub use complex::ComplexStore;
pub use hash32::Hash32Store;
pub use hash64::Hash64Store;
pub use memory::MemoryStore;
pub use radix::RadixStore;
pub use sqlite::SqliteStore;

use smallvec::SmallVec;
use std::sync::Arc;
use weir_dns_domain::{domain_hierarchy, FilterList, RuleMatch};

/// `lists` reordered so allow lists come first, keeping the given order
/// within each type.
pub(crate) fn allow_then_block(lists: &[Arc<FilterList>]) -> SmallVec<[&Arc<FilterList>; 8]> {
    let mut ordered: SmallVec<[&Arc<FilterList>; 8]> =
        lists.iter().filter(|list| list.is_allow()).collect();
    ordered.extend(lists.iter().filter(|list| !list.is_allow()));
    ordered
}

/// Shared lookup for backends that can answer membership synchronously.
pub(crate) fn first_match<F>(lists: &[Arc<FilterList>], domain: &str, contains: F) -> RuleMatch
where
    F: Fn(&FilterList, &str) -> bool,
{
    let hierarchy = domain_hierarchy(domain);
    if hierarchy.is_empty() {
        return RuleMatch::none();
    }

    for list in allow_then_block(lists) {
        if let Some(rule) = hierarchy.iter().find(|&&name| contains(list.as_ref(), name)) {
            return RuleMatch::from_list(list, *rule);
        }
    }

    RuleMatch::none()
}
