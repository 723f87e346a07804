//! Master-side replication: the replica registry, command fan-out and
//! acknowledgment bookkeeping.

use std::{collections::HashMap, sync::Arc};

use bytes::Bytes;
use thiserror::Error;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
    task::JoinSet,
};
use tracing::{debug, error, warn};

use crate::resp::encode_array;

/// Write half of a connection, shared between the connection's own replies
/// and the broadcasts a master sends to it once it registers as a replica.
pub type ConnectionWriter = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// Wraps any writer so it can be shared as a [`ConnectionWriter`].
pub fn shared_writer<W>(writer: W) -> ConnectionWriter
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    Arc::new(Mutex::new(Box::new(writer)))
}

/// Writes the whole payload and flushes, holding the writer for the duration
/// so frames from concurrent writers never interleave.
pub async fn write_to_stream(writer: &ConnectionWriter, payload: &[u8]) -> tokio::io::Result<()> {
    let mut writer_guard = writer.lock().await;
    writer_guard.write_all(payload).await?;
    writer_guard.flush().await?;

    Ok(())
}

#[derive(Error, Debug)]
pub enum ReplicationError {
    #[error("no replica registered for {0}")]
    UnknownReplica(String),
    #[error("failed to write to replica {address}: {source}")]
    Write {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// A connection that announced itself with `REPLCONF listening-port`.
pub struct Replica {
    pub writer: ConnectionWriter,
    pub listening_port: u16,
    pub bytes_acknowledged: u64,
}

/// Registered replicas keyed by the peer address of their connection.
///
/// Replicas are never removed: a dead connection just fails future writes.
#[derive(Default)]
pub struct ReplicaRegistry {
    replicas: Mutex<HashMap<String, Replica>>,
}

impl ReplicaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, address: &str, listening_port: u16, writer: ConnectionWriter) {
        let mut replicas = self.replicas.lock().await;

        debug!(replica = %address, listening_port, "registering replica");
        replicas.insert(
            address.to_string(),
            Replica {
                writer,
                listening_port,
                bytes_acknowledged: 0,
            },
        );
    }

    /// Records a `REPLCONF ACK <offset>` from the replica at `address`.
    pub async fn acknowledge(&self, address: &str, offset: u64) -> Result<(), ReplicationError> {
        let mut replicas = self.replicas.lock().await;

        let Some(replica) = replicas.get_mut(address) else {
            return Err(ReplicationError::UnknownReplica(address.to_string()));
        };

        replica.bytes_acknowledged = offset;
        debug!(replica = %address, offset, "replica acknowledged offset");

        Ok(())
    }

    pub async fn acknowledged_offset(&self, address: &str) -> Option<u64> {
        self.replicas
            .lock()
            .await
            .get(address)
            .map(|replica| replica.bytes_acknowledged)
    }

    /// Connection addresses of every registered replica.
    pub async fn addresses(&self) -> Vec<String> {
        self.replicas.lock().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.replicas.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Writes `payload` to every registered replica concurrently and waits for
    /// all writes to finish. A failed write is logged and does not affect the
    /// others. Returns how many replicas received the payload.
    pub async fn broadcast(&self, payload: Bytes) -> usize {
        // Collect the writers first so the registry lock is not held across I/O.
        let targets: Vec<(String, ConnectionWriter)> = {
            let replicas = self.replicas.lock().await;
            replicas
                .iter()
                .map(|(address, replica)| (address.clone(), Arc::clone(&replica.writer)))
                .collect()
        };

        let mut writes = JoinSet::new();

        for (address, writer) in targets {
            let payload = payload.clone();

            writes.spawn(async move {
                let result = write_to_stream(&writer, &payload).await;
                (address, result)
            });
        }

        let mut delivered = 0;

        while let Some(joined) = writes.join_next().await {
            match joined {
                Ok((_, Ok(()))) => delivered += 1,
                Ok((address, Err(e))) => {
                    warn!(replica = %address, error = %e, "failed to propagate command to replica");
                }
                Err(e) => error!(error = %e, "replica write task failed"),
            }
        }

        debug!(delivered, bytes = payload.len(), "broadcast command to replicas");

        delivered
    }

    /// Sends `REPLCONF GETACK *` to the replica at `address` to solicit a
    /// fresh acknowledgment offset.
    pub async fn request_ack(&self, address: &str) -> Result<(), ReplicationError> {
        let writer = {
            let replicas = self.replicas.lock().await;

            let Some(replica) = replicas.get(address) else {
                return Err(ReplicationError::UnknownReplica(address.to_string()));
            };

            Arc::clone(&replica.writer)
        };

        write_to_stream(&writer, encode_array(&["REPLCONF", "GETACK", "*"]).as_bytes())
            .await
            .map_err(|source| ReplicationError::Write {
                address: address.to_string(),
                source,
            })
    }
}
