//! Configuration module for Weir DNS
//!
//! This module contains all configuration structures organized by concern:
//! - `root`: Main configuration, loading and validation
//! - `engine`: Home directory and session layout
//! - `store`: Rule store backend selection
//! - `cache`: Answer cache housekeeping
//! - `upstream`: Upstream deadlines, pooling and backoff
//! - `logging`: Logging settings
//! - `reload`: File change detection
//! - `lists`: Filter lists and groups
//! - `resolvers`: Resolvers and named sources
//! - `errors`: Configuration errors

pub mod cache;
pub mod engine;
pub mod errors;
pub mod lists;
pub mod logging;
pub mod reload;
pub mod resolvers;
pub mod root;
pub mod store;
pub mod upstream;

pub use cache::CacheConfig;
pub use engine::EngineConfig;
pub use errors::ConfigError;
pub use lists::{GroupConfig, ListConfig};
pub use logging::LoggingConfig;
pub use reload::ReloadConfig;
pub use resolvers::{ResolverConfig, SourceConfig, DEFAULT_RESOLVER};
pub use root::{Config, DEFAULT_GROUP};
pub use store::{StoreConfig, STORE_KINDS};
pub use upstream::UpstreamConfig;
