//! Storage Engine Module
//!
//! This module provides the backing store for linekv: a thread-safe,
//! sharded key-value map. It is shared behind an `Arc` by every
//! connection handler and synchronizes all access internally.
//!
//! ## Example
//!
//! ```
//! use linekv::storage::{StorageEngine, StorageError};
//! use std::sync::Arc;
//!
//! let engine = Arc::new(StorageEngine::new());
//!
//! engine.set("name", "linekv");
//! assert_eq!(engine.get("name").unwrap(), "linekv");
//! assert_eq!(engine.get("missing"), Err(StorageError::NotFound));
//! ```

pub mod engine;

// Re-export commonly used types
pub use engine::{StorageEngine, StorageError};
