use crate::dns::transport::{Connection, Protocol};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, trace};
use weir_dns_domain::DomainError;

pub const DEFAULT_MAX_CONNECTIONS: usize = 2;
pub const DEFAULT_DEADLINE: Duration = Duration::from_millis(200);

/// Bounded pool of connections to one upstream address over one protocol.
///
/// The channel holds exactly `capacity` slots. A slot is either an idle
/// connection or `None`, meaning "you may dial". `get` takes a slot and every
/// successful `get` must be paired with `release` or `discard`, which put one
/// slot back. That keeps at most `capacity` connections open at once.
pub struct ConnectionPool {
    protocol: Protocol,
    address: SocketAddr,
    server_name: String,
    deadline: Duration,
    slots_tx: mpsc::Sender<Option<Connection>>,
    slots_rx: Mutex<mpsc::Receiver<Option<Connection>>>,
    closed: AtomicBool,
}

impl ConnectionPool {
    pub fn new(
        protocol: Protocol,
        address: SocketAddr,
        server_name: impl Into<String>,
        capacity: usize,
        deadline: Duration,
    ) -> Self {
        let capacity = capacity.max(1);
        let (slots_tx, slots_rx) = mpsc::channel(capacity);
        for _ in 0..capacity {
            // cannot fail: the channel was just created with this capacity
            let _ = slots_tx.try_send(None);
        }

        Self {
            protocol,
            address,
            server_name: server_name.into(),
            deadline,
            slots_tx,
            slots_rx: Mutex::new(slots_rx),
            closed: AtomicBool::new(false),
        }
    }

    /// Wait for a slot, then reuse its connection or dial a new one.
    pub async fn get(&self) -> Result<Connection, DomainError> {
        if self.is_closed() {
            return Err(self.shutdown_error());
        }

        let slot = {
            let mut rx = self.slots_rx.lock().await;
            rx.recv().await
        };

        let slot = match slot {
            Some(slot) if !self.is_closed() => slot,
            _ => {
                // pass the wake-up on to the next blocked caller
                let _ = self.slots_tx.try_send(None);
                return Err(self.shutdown_error());
            }
        };

        match slot {
            Some(conn) => {
                trace!(server = %self.address, protocol = %self.protocol, "Reusing pooled connection");
                Ok(conn)
            }
            None => {
                match Connection::dial(self.protocol, self.address, &self.server_name, self.deadline)
                    .await
                {
                    Ok(conn) => Ok(conn),
                    Err(e) => {
                        self.discard();
                        Err(e)
                    }
                }
            }
        }
    }

    /// Hand a healthy connection back. UDP sockets are closed instead.
    pub fn release(&self, conn: Connection) {
        let slot = (conn.is_reusable() && !self.is_closed()).then_some(conn);
        let _ = self.slots_tx.try_send(slot);
    }

    /// Give back the slot of a connection that failed and was dropped.
    pub fn discard(&self) {
        let _ = self.slots_tx.try_send(None);
    }

    /// One query over a pooled connection within the pool deadline.
    pub async fn exchange(&self, message_bytes: &[u8]) -> Result<Vec<u8>, DomainError> {
        let mut conn = self.get().await?;
        match conn.exchange(message_bytes, self.deadline).await {
            Ok(response) => {
                self.release(conn);
                Ok(response)
            }
            Err(e) => {
                drop(conn);
                self.discard();
                Err(e)
            }
        }
    }

    /// Close idle connections and release every blocked `get` caller.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Ok(mut rx) = self.slots_rx.try_lock() {
            while let Ok(slot) = rx.try_recv() {
                drop(slot);
            }
        }
        while self.slots_tx.try_send(None).is_ok() {}

        debug!(server = %self.address, protocol = %self.protocol, "Connection pool shut down");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    fn shutdown_error(&self) -> DomainError {
        DomainError::PoolShutdown(format!("{}/{}", self.address, self.protocol))
    }
}
