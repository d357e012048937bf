//! Command Dispatch Module
//!
//! This module implements the command-execution layer of linekv. It
//! receives raw request text, runs it through the protocol tokenizer,
//! resolves the closed [`Command`] enum, executes it against the
//! storage engine and renders the textual reply.
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │   Tokenizer     │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Resolve      │
//! │  - Validate     │
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ StorageEngine   │  (storage module)
//! └─────────────────┘
//! ```

pub mod handler;

// Re-export the main command handler
pub use handler::{
    Command, CommandError, CommandHandler, REPLY_DELETED, REPLY_NOT_FOUND, REPLY_OK,
    REPLY_VALUE_PREFIX,
};
