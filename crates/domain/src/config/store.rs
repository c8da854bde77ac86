use serde::{Deserialize, Serialize};

/// Backend selectors accepted in `store.kind` and `store.backing`.
pub const STORE_KINDS: &[&str] = &[
    "memory", "hash", "hash64", "hash32", "bloom", "radix", "sqlite", "sql",
];

/// Rule store selection and tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Backend used for exact rules (default: "hash64")
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Store that confirms candidate hits of `bloom` and `hash32` backends.
    /// Without one, bloom candidates and 32-bit hash hits are trusted as is.
    #[serde(default)]
    pub backing: Option<String>,

    /// Target false positive rate of each bloom filter (default: 0.005)
    #[serde(default = "default_fp_rate")]
    pub bloom_false_positive_rate: f64,

    /// Capacity used when a list's line count cannot be determined
    #[serde(default = "default_bloom_count")]
    pub bloom_default_count: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            backing: None,
            bloom_false_positive_rate: default_fp_rate(),
            bloom_default_count: default_bloom_count(),
        }
    }
}

fn default_kind() -> String {
    "hash64".to_string()
}

fn default_fp_rate() -> f64 {
    0.005
}

fn default_bloom_count() -> usize {
    100_000
}
