pub mod rules;

pub use rules::{BuildRuleStoreUseCase, CheckDomainUseCase, LoadSummary};
