//! Thread-Safe Storage Engine
//!
//! This module implements the backing store for linekv: a concurrent
//! map from string keys to string values.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Instead of one big lock, keys are spread over
//!    independent shards to reduce contention between connections.
//! 2. **RwLock**: Multiple concurrent readers with exclusive writers.
//! 3. **Internal Synchronization**: Callers never lock anything - the
//!    engine guarantees no data race and no lost update even when every
//!    connection handler hammers the same key.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Keys are distributed across shards using a hash function, so handlers
//! touching different keys rarely touch the same lock.
//!
//! There is no eviction, no size bound, no TTL and no persistence; the
//! engine exists to give the dispatcher something correct to call.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::RwLock;
use thiserror::Error;

/// Number of shards for the storage engine.
/// More shards = less lock contention, but more memory overhead.
const NUM_SHARDS: usize = 16;

/// Errors produced by storage operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The key is not present in the store.
    #[error("key not found")]
    NotFound,
}

/// A single shard containing a portion of the key-value pairs.
#[derive(Debug, Default)]
struct Shard {
    data: RwLock<HashMap<String, String>>,
}

/// The concurrent key-value store shared by every connection handler.
///
/// # Thread Safety
///
/// This struct is designed to be wrapped in an `Arc` and shared across
/// all connection handler tasks. All operations are thread-safe.
///
/// # Example
///
/// ```
/// use linekv::storage::StorageEngine;
///
/// let engine = StorageEngine::new();
///
/// engine.set("name", "linekv");
/// assert_eq!(engine.get("name").unwrap(), "linekv");
///
/// engine.del("name").unwrap();
/// assert!(engine.get("name").is_err());
/// ```
pub struct StorageEngine {
    /// Sharded storage for reduced lock contention
    shards: Vec<Shard>,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("shards", &self.shards.len())
            .field("keys", &self.len())
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates a new, empty storage engine.
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS).map(|_| Shard::default()).collect();
        Self { shards }
    }

    /// Determines which shard a key belongs to.
    #[inline]
    fn shard_for(&self, key: &str) -> &Shard {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % NUM_SHARDS]
    }

    /// Sets a key-value pair.
    ///
    /// An unconditional upsert: if the key already exists, its value is
    /// overwritten. Never fails.
    pub fn set(&self, key: &str, value: &str) {
        let mut data = self.shard_for(key).data.write().unwrap();
        data.insert(key.to_string(), value.to_string());
    }

    /// Gets the value for a key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the key is absent.
    pub fn get(&self, key: &str) -> Result<String, StorageError> {
        let data = self.shard_for(key).data.read().unwrap();
        data.get(key).cloned().ok_or(StorageError::NotFound)
    }

    /// Removes a key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the key is absent.
    pub fn del(&self, key: &str) -> Result<(), StorageError> {
        let mut data = self.shard_for(key).data.write().unwrap();
        data.remove(key).map(|_| ()).ok_or(StorageError::NotFound)
    }

    /// Returns the number of live keys across all shards.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.data.read().unwrap().len())
            .sum()
    }

    /// Returns `true` if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
