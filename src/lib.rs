//! A Redis-compatible in-memory key-value server with master/replica
//! replication.
//!
//! The server speaks the Redis Serialization Protocol (RESP) and supports:
//!
//! - Key-value operations with optional millisecond expiry (GET, SET)
//! - Server commands (PING, ECHO, INFO)
//! - Master-replica replication (REPLCONF, PSYNC), with write commands
//!   streamed to every registered replica and acknowledged offsets tracked
//!   per replica
//!
//! Connections are served concurrently on Tokio; all shared state lives in a
//! single [`state::ServerState`] passed to every connection.

pub mod commands;
pub mod connection;
pub mod handshake;
pub mod key_value_store;
pub mod replication;
pub mod resp;
pub mod server;
pub mod state;
