pub mod complex_rule;
pub mod engine;
pub mod factory;
mod hashing;
pub mod store;

pub use complex_rule::ComplexRule;
pub use engine::{RuleEngine, RuleGeneration};
pub use factory::{create_store, StoreKind};
pub use store::{
    BloomStore, ComplexStore, Hash32Store, Hash64Store, MemoryStore, RadixStore, SqliteStore,
};
