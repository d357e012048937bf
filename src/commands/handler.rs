//! Command Dispatcher
//!
//! This module binds validated request tokens to storage operations and
//! renders the textual replies the client sees.
//!
//! ## Supported Commands
//!
//! | Command   | Args | Success reply | Not-found reply |
//! |-----------|------|---------------|-----------------|
//! | `SET k v` | 2    | `OK`          | -               |
//! | `GET k`   | 1    | `VALUE <v>`   | `NOT_FOUND`     |
//! | `DEL k`   | 1    | `DELETED`     | `NOT_FOUND`     |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌──────────────┐    ┌─────────────┐    │
//! │  │   parse()   │───>│ from_tokens()│───>│  execute()  │    │
//! │  └─────────────┘    └──────────────┘    └─────────────┘    │
//! │                                                │            │
//! │                                                ▼            │
//! │                                        StorageEngine        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Commands are resolved once into a closed [`Command`] enum, so adding
//! a command is a compile-time-checked change rather than open-ended
//! string dispatch.
//!
//! A missing key is not a failure of this layer: `GET`/`DEL` of an
//! absent key produce the successful reply `NOT_FOUND`, never an error.

use crate::protocol::{parse, ParseError};
use crate::storage::{StorageEngine, StorageError};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Reply for a successful `SET`.
pub const REPLY_OK: &str = "OK";
/// Reply for a successful `DEL`.
pub const REPLY_DELETED: &str = "DELETED";
/// Reply for `GET`/`DEL` of an absent key.
pub const REPLY_NOT_FOUND: &str = "NOT_FOUND";
/// Prefix of a successful `GET` reply.
pub const REPLY_VALUE_PREFIX: &str = "VALUE ";

/// Errors produced while resolving and executing a request.
///
/// Each variant's `Display` text is what a client sees as the reply to
/// a malformed request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The request failed syntactic validation.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The command name is syntactically valid but not a known command.
    #[error("invalid command")]
    InvalidCommand,

    /// The command exists but got the wrong number of arguments.
    #[error("invalid quantity of arguments")]
    InvalidArgumentCount,
}

/// A fully resolved client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store a value under a key, overwriting any previous value.
    Set { key: String, value: String },
    /// Look up the value for a key.
    Get { key: String },
    /// Remove a key.
    Del { key: String },
}

impl Command {
    /// Resolves validated tokens into a command.
    ///
    /// The unknown-command check runs before the argument-count check:
    /// a syntactically valid but unrecognized name is
    /// [`CommandError::InvalidCommand`], while a known command with the
    /// wrong token count is [`CommandError::InvalidArgumentCount`].
    pub fn from_tokens(tokens: &[&str]) -> Result<Self, CommandError> {
        let (name, args) = tokens.split_first().ok_or(ParseError::EmptyCommand)?;

        match *name {
            "SET" => match args {
                [key, value] => Ok(Self::Set {
                    key: (*key).to_string(),
                    value: (*value).to_string(),
                }),
                _ => Err(CommandError::InvalidArgumentCount),
            },
            "GET" => match args {
                [key] => Ok(Self::Get {
                    key: (*key).to_string(),
                }),
                _ => Err(CommandError::InvalidArgumentCount),
            },
            "DEL" => match args {
                [key] => Ok(Self::Del {
                    key: (*key).to_string(),
                }),
                _ => Err(CommandError::InvalidArgumentCount),
            },
            _ => Err(CommandError::InvalidCommand),
        }
    }

    /// The command's name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Set { .. } => "SET",
            Self::Get { .. } => "GET",
            Self::Del { .. } => "DEL",
        }
    }
}

/// Executes raw requests against the storage engine.
///
/// Cheap to clone; every connection handler carries its own copy while
/// the storage engine stays shared.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    /// The storage engine (shared across connections)
    storage: Arc<StorageEngine>,
}

impl CommandHandler {
    /// Creates a new command handler with the given storage engine.
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }

    /// Parses, resolves and executes one raw request.
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`] when the request is malformed; the
    /// error text doubles as the client-visible reply. A missing key is
    /// **not** an error - it maps to the successful `NOT_FOUND` reply.
    pub fn execute(&self, raw: &str) -> Result<String, CommandError> {
        let tokens = parse(raw).inspect_err(|error| {
            debug!(%error, "failed to parse request");
        })?;

        let command = Command::from_tokens(&tokens).inspect_err(|error| {
            debug!(%error, command = tokens[0], "failed to resolve command");
        })?;

        debug!(command = command.name(), "executing command");

        let reply = match &command {
            Command::Set { key, value } => {
                self.storage.set(key, value);
                REPLY_OK.to_string()
            }
            Command::Get { key } => match self.storage.get(key) {
                Ok(value) => format!("{REPLY_VALUE_PREFIX}{value}"),
                Err(StorageError::NotFound) => REPLY_NOT_FOUND.to_string(),
            },
            Command::Del { key } => match self.storage.del(key) {
                Ok(()) => REPLY_DELETED.to_string(),
                Err(StorageError::NotFound) => REPLY_NOT_FOUND.to_string(),
            },
        };

        Ok(reply)
    }
}
