pub mod cache_sweep;
pub mod reload;
pub mod runner;

pub use cache_sweep::CacheSweepJob;
pub use reload::{rule_engine_reload, ReloadCallback, ReloadCoordinator};
pub use runner::JobRunner;
