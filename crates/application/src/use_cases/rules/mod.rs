pub mod build_store;
pub mod check_domain;

pub use build_store::{BuildRuleStoreUseCase, LoadSummary};
pub use check_domain::CheckDomainUseCase;
