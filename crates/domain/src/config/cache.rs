use serde::{Deserialize, Serialize};

/// Answer cache housekeeping
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between housekeeping sweeps (default: 60)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Entries older than this are dropped by the sweep, whatever their
    /// record TTL says (default: 300)
    #[serde(default = "default_max_entry_age")]
    pub max_entry_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval_secs: default_sweep_interval(),
            max_entry_age_secs: default_max_entry_age(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_max_entry_age() -> u64 {
    300
}
