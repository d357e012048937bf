//! Connection Handling Module
//!
//! Each client connection accepted by the server is handled by its own
//! async task running a [`ConnectionHandler`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────┐    │
//! │  │ Read request│───>│ Dispatch    │───>│ Write reply  │    │
//! │  └─────────────┘    └─────────────┘    └──────────────┘    │
//! │         ▲                                      │            │
//! │         └──────────────────────────────────────┘            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Requests on one connection are processed strictly sequentially; the
//! next read only starts after the previous reply has been written.
//! Connections are isolated from each other: an I/O failure or a
//! recovered panic terminates only the offending connection.

pub mod handler;

// Re-export commonly used types
pub use handler::{ConnectionError, ConnectionHandler};
