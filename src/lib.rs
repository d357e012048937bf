//! # linekv - A Line-Oriented In-Memory Key-Value Server
//!
//! linekv is an in-memory key-value store served over a plain-text TCP
//! protocol. Clients write textual `SET`/`GET`/`DEL` requests and read
//! back one textual reply per request.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            linekv                               │
//! │                                                                 │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐          │
//! │  │   Server    │───>│ Connection  │───>│  Command    │          │
//! │  │ (admission) │    │  Handler    │    │  Handler    │          │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘          │
//! │        │                                      │                 │
//! │        │ semaphore                            ▼                 │
//! │        │ (max_connections     ┌──────────────────────────────┐  │
//! │        │  admission slots)    │        StorageEngine         │  │
//! │        │                      │  ┌────────┐      ┌────────┐  │  │
//! │  ┌─────┴───────┐              │  │Shard 0 │ ...  │Shard N │  │  │
//! │  │  Tokenizer  │              │  │RwLock  │      │RwLock  │  │  │
//! │  │ (protocol)  │              │  └────────┘      └────────┘  │  │
//! │  └─────────────┘              └──────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Protocol
//!
//! | Command   | Success reply | Not-found reply |
//! |-----------|---------------|-----------------|
//! | `SET k v` | `OK`          | -               |
//! | `GET k`   | `VALUE <v>`   | `NOT_FOUND`     |
//! | `DEL k`   | `DELETED`     | `NOT_FOUND`     |
//!
//! Requests are whitespace-separated tokens; command names are
//! uppercase and case-sensitive, and tokens are restricted to the
//! alphabet `[A-Za-z0-9*/_.]`. A malformed request is answered with the
//! error text and the connection stays open.
//!
//! ## Quick Start
//!
//! ```no_run
//! use linekv::server::{Server, ServerConfig};
//! use linekv::storage::StorageEngine;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = Arc::new(StorageEngine::new());
//!     let server = Server::bind(ServerConfig::default(), storage).await?;
//!
//!     server.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: tokenizer and syntactic validation for requests
//! - [`storage`]: thread-safe sharded key-value engine
//! - [`commands`]: command resolution, execution and reply rendering
//! - [`connection`]: per-connection read-dispatch-write loop
//! - [`server`]: configuration, admission loop and shutdown plumbing
//!
//! ## Design Highlights
//!
//! ### Bounded Admission
//!
//! A counting semaphore caps live connections at `max_connections`.
//! Connections beyond the bound are closed immediately rather than
//! queued, so an overloaded server fails fast instead of building a
//! backlog.
//!
//! ### Failure Isolation
//!
//! Malformed commands become textual replies. I/O errors, idle
//! timeouts and recovered panics terminate only the offending
//! connection; the server aggregates them and keeps serving everyone
//! else.

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::{Command, CommandError, CommandHandler};
pub use connection::{ConnectionError, ConnectionHandler};
pub use protocol::{parse, ParseError};
pub use server::{Server, ServerConfig, ServerError};
pub use storage::{StorageEngine, StorageError};

/// Version of linekv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
