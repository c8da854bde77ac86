use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the engine keeps downloaded lists and per-generation session data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Base directory (default: "./weir-data")
    #[serde(default = "default_home")]
    pub home: String,
}

impl EngineConfig {
    /// Parent of every generation's session directory.
    pub fn sessions_root(&self) -> PathBuf {
        PathBuf::from(&self.home).join("sessions")
    }

    /// Where remote lists are expected to have been downloaded to.
    pub fn lists_root(&self) -> PathBuf {
        PathBuf::from(&self.home).join("lists")
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            home: default_home(),
        }
    }
}

fn default_home() -> String {
    "./weir-data".to_string()
}
