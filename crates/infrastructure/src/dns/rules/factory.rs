use super::store::{
    BloomStore, ComplexStore, Hash32Store, Hash64Store, MemoryStore, RadixStore, SqliteStore,
};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};
use weir_dns_application::ports::RuleStore;
use weir_dns_domain::config::StoreConfig;
use weir_dns_domain::DomainError;

/// Backend selected by `store.kind` / `store.backing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Memory,
    Hash64,
    Hash32,
    Bloom,
    Radix,
    Sql,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Memory => "memory",
            StoreKind::Hash64 => "hash64",
            StoreKind::Hash32 => "hash32",
            StoreKind::Bloom => "bloom",
            StoreKind::Radix => "radix",
            StoreKind::Sql => "sqlite",
        }
    }

    /// Backends that can confirm another backend's candidates.
    pub fn can_back(&self) -> bool {
        !matches!(self, StoreKind::Bloom)
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreKind::Memory),
            "hash" | "hash64" => Ok(StoreKind::Hash64),
            "hash32" => Ok(StoreKind::Hash32),
            "bloom" => Ok(StoreKind::Bloom),
            "radix" => Ok(StoreKind::Radix),
            "sqlite" | "sql" => Ok(StoreKind::Sql),
            other => Err(DomainError::StoreError(format!(
                "unknown store kind '{other}'"
            ))),
        }
    }
}

/// Build the configured backend, with its backing store when it takes one,
/// wrapped so that wildcard and regex rules are handled in front of it.
pub fn create_store(config: &StoreConfig) -> Result<Box<dyn RuleStore>, DomainError> {
    let kind: StoreKind = config.kind.parse()?;
    let backing = config
        .backing
        .as_deref()
        .map(str::parse::<StoreKind>)
        .transpose()?;

    if let Some(backing) = backing {
        if !backing.can_back() {
            return Err(DomainError::StoreError(format!(
                "'{backing}' cannot back another store"
            )));
        }
        if !matches!(kind, StoreKind::Bloom | StoreKind::Hash32) {
            warn!(store = %kind, backing = %backing, "Store takes no backing store, ignoring it");
        }
    }

    let backend: Box<dyn RuleStore> = match kind {
        StoreKind::Memory => Box::new(MemoryStore::new()),
        StoreKind::Hash64 => Box::new(Hash64Store::new()),
        StoreKind::Radix => Box::new(RadixStore::new()),
        StoreKind::Sql => Box::new(SqliteStore::new()),
        StoreKind::Hash32 => match backing {
            Some(backing) => Box::new(Hash32Store::with_delegate(simple_store(backing))),
            None => Box::new(Hash32Store::new()),
        },
        StoreKind::Bloom => {
            let bloom = BloomStore::new(
                config.bloom_false_positive_rate,
                config.bloom_default_count,
            );
            match backing {
                Some(backing) => Box::new(bloom.with_backing(simple_store(backing))),
                None => Box::new(bloom),
            }
        }
    };

    info!(
        store = %kind,
        backing = backing.map(|b| b.as_str()).unwrap_or("none"),
        "Rule store created"
    );

    Ok(Box::new(ComplexStore::new(backend)))
}

fn simple_store(kind: StoreKind) -> Box<dyn RuleStore> {
    match kind {
        StoreKind::Memory => Box::new(MemoryStore::new()),
        StoreKind::Hash64 => Box::new(Hash64Store::new()),
        StoreKind::Hash32 => Box::new(Hash32Store::new()),
        StoreKind::Radix => Box::new(RadixStore::new()),
        StoreKind::Sql => Box::new(SqliteStore::new()),
        StoreKind::Bloom => Box::new(BloomStore::default()),
    }
}
