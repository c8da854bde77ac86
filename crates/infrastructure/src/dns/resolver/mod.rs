pub mod domain_filter;
pub mod reloadable;
#[allow(clippy::module_inception)]
pub mod resolver;
pub mod resolver_map;

pub use domain_filter::DomainFilter;
pub use reloadable::ReloadableResolverMap;
pub use resolver::Resolver;
pub use resolver_map::{ResolutionResult, ResolverMap};
