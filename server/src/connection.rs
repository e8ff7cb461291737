//! Transport-level connection bookkeeping
//!
//! Tracks which network addresses map to which client ids and when each
//! connection was last heard from. Liveness is the table's only policy:
//! a connection that stays silent past the timeout is expired and surfaces
//! to the core as an ordinary disconnect, so queued and in-session clients
//! share a single eviction path.

use log::info;
use shared::ClientId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// How long a connection may stay silent before it is presumed dead.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// One live transport connection.
#[derive(Debug)]
pub struct Connection {
    pub id: ClientId,
    pub addr: SocketAddr,
    pub last_seen: Instant,
}

impl Connection {
    pub fn new(id: ClientId, addr: SocketAddr) -> Self {
        Connection {
            id,
            addr,
            last_seen: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// All live connections, capacity-capped, indexed by client id.
pub struct ConnectionTable {
    connections: HashMap<ClientId, Connection>,
    next_id: ClientId,
    capacity: usize,
}

impl ConnectionTable {
    pub fn new(capacity: usize) -> Self {
        ConnectionTable {
            connections: HashMap::new(),
            next_id: 1,
            capacity,
        }
    }

    /// Registers a new connection, returning its id, or `None` when the
    /// table is full.
    pub fn add(&mut self, addr: SocketAddr) -> Option<ClientId> {
        if self.connections.len() >= self.capacity {
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;

        info!("Client {} connected from {}", id, addr);
        self.connections.insert(id, Connection::new(id, addr));
        Some(id)
    }

    /// Drops a connection. Returns true if it was present.
    pub fn remove(&mut self, client: ClientId) -> bool {
        if self.connections.remove(&client).is_some() {
            info!("Client {} disconnected", client);
            true
        } else {
            false
        }
    }

    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<ClientId> {
        self.connections
            .values()
            .find(|connection| connection.addr == addr)
            .map(|connection| connection.id)
    }

    pub fn addr_of(&self, client: ClientId) -> Option<SocketAddr> {
        self.connections.get(&client).map(|c| c.addr)
    }

    /// Marks the connection as alive now.
    pub fn touch(&mut self, client: ClientId) {
        if let Some(connection) = self.connections.get_mut(&client) {
            connection.touch();
        }
    }

    /// Removes every connection that exceeded the timeout and returns
    /// their ids so the core can run its disconnect path for each.
    pub fn check_timeouts(&mut self) -> Vec<ClientId> {
        let timed_out: Vec<ClientId> = self
            .connections
            .values()
            .filter(|connection| connection.is_timed_out(CONNECTION_TIMEOUT))
            .map(|connection| connection.id)
            .collect();

        for &client in &timed_out {
            info!("Client {} timed out", client);
            self.connections.remove(&client);
        }

        timed_out
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
