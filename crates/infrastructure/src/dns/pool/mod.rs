pub mod connection_pool;
pub mod registry;

pub use connection_pool::{ConnectionPool, DEFAULT_DEADLINE, DEFAULT_MAX_CONNECTIONS};
pub use registry::PoolRegistry;
