pub mod rule_engine;
pub mod rule_store;

pub use rule_engine::RuleEnginePort;
pub use rule_store::RuleStore;
