//! Process-wide server state, built once at startup and handed to every
//! connection as an `Arc<ServerState>`.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::trace;

use crate::{key_value_store::KeyValueStore, replication::ReplicaRegistry};

/// Replication id shared by every master instance.
pub const MASTER_REPLICATION_ID: &str = "8371b4fb1155b71f4a04d3e1bc3e18c4a990aeeb";

/// Empty RDB image streamed to every replica during a full resync.
pub const EMPTY_RDB_FILE: [u8; 88] = [
    0x52, 0x45, 0x44, 0x49, 0x53, 0x30, 0x30, 0x31, 0x31, 0xfa, 0x09, 0x72, 0x65, 0x64, 0x69,
    0x73, 0x2d, 0x76, 0x65, 0x72, 0x05, 0x37, 0x2e, 0x32, 0x2e, 0x30, 0xfa, 0x0a, 0x72, 0x65,
    0x64, 0x69, 0x73, 0x2d, 0x62, 0x69, 0x74, 0x73, 0xc0, 0x40, 0xfa, 0x05, 0x63, 0x74, 0x69,
    0x6d, 0x65, 0xc2, 0x6d, 0x08, 0xbc, 0x65, 0xfa, 0x08, 0x75, 0x73, 0x65, 0x64, 0x2d, 0x6d,
    0x65, 0x6d, 0xc2, 0xb0, 0xc4, 0x10, 0x00, 0xfa, 0x08, 0x61, 0x6f, 0x66, 0x2d, 0x62, 0x61,
    0x73, 0x65, 0xc0, 0x00, 0xff, 0xf0, 0x6e, 0x3b, 0xfe, 0xc0, 0xff, 0x5a, 0xa2,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedisRole {
    Master,
    /// Replicates from the master at `(host, port)`.
    Replica(String, u16),
}

impl RedisRole {
    pub fn as_string(&self) -> String {
        match self {
            RedisRole::Master => "master".to_string(),
            RedisRole::Replica(_, _) => "slave".to_string(),
        }
    }

    pub fn is_master(&self) -> bool {
        matches!(self, RedisRole::Master)
    }
}

/// Replication identity: our own id and offset as a master, or the master's
/// as announced by FULLRESYNC when replicating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationInfo {
    pub repl_id: String,
    pub repl_offset: i64,
}

pub struct ServerState {
    pub port: u16,
    pub role: RedisRole,
    pub store: KeyValueStore,
    pub replicas: ReplicaRegistry,
    replication: RwLock<ReplicationInfo>,
    ack_offset: AtomicU64,
    /// Held from applying a write until it has been broadcast, so replicas
    /// see writes in the order the keyspace applied them.
    write_order: Mutex<()>,
}

impl ServerState {
    pub fn new(port: u16, role: RedisRole) -> Self {
        let replication = match role {
            RedisRole::Master => ReplicationInfo {
                repl_id: MASTER_REPLICATION_ID.to_string(),
                repl_offset: 0,
            },
            RedisRole::Replica(_, _) => ReplicationInfo {
                repl_id: "?".to_string(),
                repl_offset: -1,
            },
        };

        Self {
            port,
            role,
            store: KeyValueStore::new(),
            replicas: ReplicaRegistry::new(),
            replication: RwLock::new(replication),
            ack_offset: AtomicU64::new(0),
            write_order: Mutex::new(()),
        }
    }

    pub async fn replication_info(&self) -> ReplicationInfo {
        self.replication.read().await.clone()
    }

    /// Adopts the identity a master announced in its FULLRESYNC reply.
    pub async fn set_replication_info(&self, repl_id: String, repl_offset: i64) {
        let mut replication = self.replication.write().await;
        replication.repl_id = repl_id;
        replication.repl_offset = repl_offset;
    }

    /// Forwards the exact bytes of a write command to every replica and
    /// advances the master replication offset by their length.
    pub async fn propagate(&self, frame: Bytes) -> usize {
        {
            let mut replication = self.replication.write().await;
            replication.repl_offset += frame.len() as i64;
        }

        self.replicas.broadcast(frame).await
    }

    /// Serializes propagated writes. Hold the guard across both applying the
    /// command and [`ServerState::propagate`].
    pub async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_order.lock().await
    }

    /// Bytes of the master stream this replica has consumed.
    pub fn ack_offset(&self) -> u64 {
        self.ack_offset.load(Ordering::SeqCst)
    }

    pub fn advance_ack_offset(&self, consumed: usize) {
        let offset = self.ack_offset.fetch_add(consumed as u64, Ordering::SeqCst) + consumed as u64;
        trace!(consumed, offset, "advanced replica ack offset");
    }
}
