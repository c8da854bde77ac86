use serde::{Deserialize, Serialize};

/// Settings shared by every upstream DNS source
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Deadline for each dial and each exchange, in milliseconds (default: 200)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Connections kept per upstream address and protocol (default: 2)
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Seconds an upstream is skipped after a transport error (default: 15)
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            pool_size: default_pool_size(),
            backoff_secs: default_backoff_secs(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    200
}

fn default_pool_size() -> usize {
    2
}

fn default_backoff_secs() -> u64 {
    15
}
