pub mod key;
pub mod metrics;
pub mod storage;

pub use key::cache_key;
pub use metrics::CacheMetrics;
pub use storage::DnsCache;
