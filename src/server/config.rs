//! Server configuration.
//!
//! A plain struct with named fields and explicit defaults. Validation
//! happens once, at server construction - there are no option functions
//! and no partially-built servers.

use crate::server::listener::ServerError;
use std::time::Duration;

/// Default listen address.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:3323";

/// Default bound on concurrently served connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 100;

/// Default per-read buffer size in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Default idle timeout for reads and writes.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Configuration consumed by [`crate::server::Server`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the TCP listener binds to.
    pub address: String,

    /// Maximum number of concurrently served connections. Connections
    /// arriving beyond this bound are closed immediately, not queued.
    pub max_connections: usize,

    /// Size of the per-connection read buffer. A request longer than
    /// this is silently truncated to the buffer size.
    pub buffer_size: usize,

    /// How long a connection may sit in a read or write before being
    /// closed. `None` disables the deadline.
    pub idle_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
        }
    }
}

impl ServerConfig {
    /// Checks the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidConfiguration`] when
    /// `max_connections` or `buffer_size` is zero.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.max_connections == 0 {
            return Err(ServerError::InvalidConfiguration(
                "max_connections must be greater than zero",
            ));
        }
        if self.buffer_size == 0 {
            return Err(ServerError::InvalidConfiguration(
                "buffer_size must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_max_connections_rejected() {
        let config = ServerConfig {
            max_connections: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ServerError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_zero_buffer_size_rejected() {
        let config = ServerConfig {
            buffer_size: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ServerError::InvalidConfiguration(_))
        ));
    }
}
