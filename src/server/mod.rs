//! Server Module
//!
//! The admission side of linekv: configuration, the TCP accept loop
//! with its connection bound, and shutdown signal plumbing.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Server                               │
//! │                                                             │
//! │   accept ──> try_acquire permit ──┬── ok ──> spawn handler  │
//! │                                   │                         │
//! │                                   └── full ──> close        │
//! │                                                             │
//! │   shutdown future ──> drop broadcast ──> handlers drain     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use linekv::server::{Server, ServerConfig};
//! use linekv::storage::StorageEngine;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), linekv::server::ServerError> {
//! let storage = Arc::new(StorageEngine::new());
//! let server = Server::bind(ServerConfig::default(), storage).await?;
//!
//! server.serve(async {
//!     tokio::signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
//! }).await
//! # }
//! ```

pub mod config;
pub mod listener;
pub mod shutdown;

// Re-export commonly used types
pub use config::{
    ServerConfig, DEFAULT_ADDRESS, DEFAULT_BUFFER_SIZE, DEFAULT_IDLE_TIMEOUT,
    DEFAULT_MAX_CONNECTIONS,
};
pub use listener::{Server, ServerError};
pub use shutdown::Shutdown;
