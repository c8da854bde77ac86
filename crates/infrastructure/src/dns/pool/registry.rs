use super::ConnectionPool;
use crate::dns::transport::Protocol;
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use weir_dns_domain::config::UpstreamConfig;

/// One [`ConnectionPool`] per upstream address and protocol, shared by every
/// source that targets the same upstream.
pub struct PoolRegistry {
    pools: DashMap<(Protocol, SocketAddr), Arc<ConnectionPool>, FxBuildHasher>,
    capacity: usize,
    deadline: Duration,
}

impl PoolRegistry {
    pub fn new(capacity: usize, deadline: Duration) -> Self {
        Self {
            pools: DashMap::with_hasher(FxBuildHasher),
            capacity,
            deadline,
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self::new(config.pool_size, Duration::from_millis(config.timeout_ms))
    }

    pub fn pool(
        &self,
        protocol: Protocol,
        address: SocketAddr,
        server_name: &str,
    ) -> Arc<ConnectionPool> {
        self.pools
            .entry((protocol, address))
            .or_insert_with(|| {
                Arc::new(ConnectionPool::new(
                    protocol,
                    address,
                    server_name,
                    self.capacity,
                    self.deadline,
                ))
            })
            .clone()
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn shutdown_all(&self) {
        for pool in self.pools.iter() {
            pool.shutdown();
        }
    }
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new(
            super::DEFAULT_MAX_CONNECTIONS,
            super::DEFAULT_DEADLINE,
        )
    }
}
