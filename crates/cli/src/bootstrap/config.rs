use tracing::info;
use weir_dns_domain::Config;

/// Command line values that win over the configuration file.
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub home: Option<String>,
    pub store: Option<String>,
    pub log_level: Option<String>,
}

pub fn load_config(config_path: Option<&str>, overrides: ConfigOverrides) -> anyhow::Result<Config> {
    let mut config = Config::load(config_path)?;

    if let Some(home) = overrides.home {
        config.engine.home = home;
    }
    if let Some(store) = overrides.store {
        config.store.kind = store;
    }
    if let Some(level) = overrides.log_level {
        config.logging.level = level;
    }

    config.validate()?;
    Ok(config)
}

/// Logged once the subscriber is installed.
pub fn log_config_summary(config_path: Option<&str>, config: &Config) {
    info!(
        config_file = config_path.unwrap_or("default"),
        home = %config.engine.home,
        store = %config.store.kind,
        backing = config.store.backing.as_deref().unwrap_or("none"),
        lists = config.lists.len(),
        resolvers = config.resolvers.len(),
        "Configuration loaded"
    );
}
