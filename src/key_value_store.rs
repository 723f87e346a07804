//! The keyspace: string keys mapped to string values with an optional
//! absolute expiry, guarded by a single lock.

use std::{
    collections::HashMap,
    time::{SystemTime, UNIX_EPOCH},
};

use tokio::sync::Mutex;
use tracing::{trace, warn};

/// A stored value. `expiration` is an absolute wall-clock timestamp in
/// milliseconds since the unix epoch; `None` means the key never expires.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub data: String,
    pub expiration: Option<u64>,
}

impl Value {
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        matches!(self.expiration, Some(expiration) if now_ms >= expiration)
    }
}

/// Result of a SET against the keyspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Stored,
    /// The key is already in the keyspace. Keys are write-once, so nothing changed.
    KeyExists,
}

#[derive(Debug, Default)]
pub struct KeyValueStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl KeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data` under `key` unless the key is already present.
    ///
    /// An expired entry that no GET has reaped yet still counts as present.
    pub async fn set(&self, key: String, data: String, expiration: Option<u64>) -> SetOutcome {
        self.set_at(key, data, expiration, get_timestamp_in_milliseconds())
            .await
    }

    /// Like [`KeyValueStore::set`] with an explicit notion of "now". Only
    /// used for logging; reaping is left to [`KeyValueStore::get_at`].
    pub async fn set_at(
        &self,
        key: String,
        data: String,
        expiration: Option<u64>,
        now_ms: u64,
    ) -> SetOutcome {
        let mut entries = self.entries.lock().await;

        if let Some(existing) = entries.get(&key) {
            if existing.is_expired_at(now_ms) {
                trace!(key = %key, "SET hit an expired key that was not reaped yet");
            }

            warn!(key = %key, "key already exists, SET ignored");
            return SetOutcome::KeyExists;
        }

        entries.insert(key, Value { data, expiration });

        SetOutcome::Stored
    }

    /// Returns the live value for `key`, deleting it first if it has expired.
    pub async fn get(&self, key: &str) -> Option<String> {
        self.get_at(key, get_timestamp_in_milliseconds()).await
    }

    pub async fn get_at(&self, key: &str, now_ms: u64) -> Option<String> {
        let mut entries = self.entries.lock().await;

        match entries.get(key) {
            Some(value) if value.is_expired_at(now_ms) => {
                trace!(key = %key, "lazily expiring key");
                entries.remove(key);
                None
            }
            Some(value) => Some(value.data.clone()),
            None => None,
        }
    }

    /// Raw entry lookup without expiring anything.
    pub async fn entry(&self, key: &str) -> Option<Value> {
        self.entries.lock().await.get(key).cloned()
    }

    /// Number of entries, including expired ones that were not reaped yet.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Milliseconds since the unix epoch. A clock set before the epoch reads as 0.
pub fn get_timestamp_in_milliseconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}
