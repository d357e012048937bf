//! Server Admission Loop
//!
//! The [`Server`] accepts connections, bounds how many run at once and
//! aggregates handler results.
//!
//! ## Admission
//!
//! A counting semaphore holds `max_connections` permits. Each accepted
//! connection tries to take a permit **without waiting**: if none is
//! available the connection is closed on the spot. There is no queue
//! and no backpressure - rejected, not held. The permit travels into
//! the handler task and is released when the task ends.
//!
//! ## Shutdown
//!
//! `serve` runs until the supplied shutdown future resolves or the
//! accept loop fails. On shutdown the broadcast sender is dropped,
//! which wakes every live handler; the server then waits for **all**
//! in-flight handlers to finish. The first handler error, if any, is
//! the overall result; otherwise the accept loop's own result is.

use crate::commands::CommandHandler;
use crate::connection::{ConnectionError, ConnectionHandler};
use crate::server::config::ServerConfig;
use crate::server::shutdown::Shutdown;
use crate::storage::StorageEngine;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio::time;
use tracing::{debug, info, warn};

/// Pause before retrying after a transient accept failure.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Errors fatal to the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configuration failed validation at construction.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),

    /// Binding the TCP listener failed.
    #[error("failed to bind listener: {0}")]
    Listen(#[source] io::Error),

    /// Accepting a connection failed with a non-transient error.
    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),

    /// A connection handler terminated with an error.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// The TCP server: listener, admission semaphore and the dispatcher
/// handed to every connection.
#[derive(Debug)]
pub struct Server {
    /// The bound TCP listener
    listener: TcpListener,

    /// Dispatcher cloned into each connection handler
    dispatcher: CommandHandler,

    /// Admission slots; one permit per live connection
    limit_connections: Arc<Semaphore>,

    /// Per-connection read buffer size
    buffer_size: usize,

    /// Per-connection idle deadline
    idle_timeout: Option<Duration>,
}

impl Server {
    /// Validates the configuration and binds the listener.
    ///
    /// # Errors
    ///
    /// [`ServerError::InvalidConfiguration`] when `max_connections` or
    /// `buffer_size` is zero; [`ServerError::Listen`] when the bind
    /// fails.
    pub async fn bind(
        config: ServerConfig,
        storage: Arc<StorageEngine>,
    ) -> Result<Self, ServerError> {
        config.validate()?;

        let listener = TcpListener::bind(&config.address)
            .await
            .map_err(ServerError::Listen)?;

        Ok(Self {
            listener,
            dispatcher: CommandHandler::new(storage),
            limit_connections: Arc::new(Semaphore::new(config.max_connections)),
            buffer_size: config.buffer_size,
            idle_timeout: config.idle_timeout,
        })
    }

    /// The address the listener actually bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves connections until `shutdown` resolves or accepting fails.
    ///
    /// All in-flight connection handlers are awaited before this
    /// returns, whatever ended the accept loop.
    ///
    /// # Errors
    ///
    /// The first handler error, if any occurred; otherwise a
    /// non-transient [`ServerError::Accept`] from the accept loop.
    pub async fn serve(self, shutdown: impl Future<Output = ()>) -> Result<(), ServerError> {
        if let Ok(address) = self.listener.local_addr() {
            info!(address = %address, "server listening");
        }

        let (notify_shutdown, _) = broadcast::channel(1);
        let mut handlers: JoinSet<Result<(), ConnectionError>> = JoinSet::new();
        let mut first_error: Option<ConnectionError> = None;

        let accept_result = tokio::select! {
            res = self.accept_loop(&mut handlers, &notify_shutdown, &mut first_error) => res,
            () = shutdown => {
                info!("shutdown signal received, draining connections");
                Ok(())
            }
        };

        // Dropping the sender delivers the shutdown signal to every
        // live handler's receiver.
        drop(notify_shutdown);

        while let Some(joined) = handlers.join_next().await {
            record_handler_result(joined, &mut first_error);
        }

        match first_error {
            Some(error) => Err(ServerError::Connection(error)),
            None => accept_result,
        }
    }

    /// Accepts connections forever, spawning a bounded handler task per
    /// connection.
    async fn accept_loop(
        &self,
        handlers: &mut JoinSet<Result<(), ConnectionError>>,
        notify_shutdown: &broadcast::Sender<()>,
        first_error: &mut Option<ConnectionError>,
    ) -> Result<(), ServerError> {
        loop {
            // Reap handlers that already finished so their results are
            // not held until shutdown.
            while let Some(joined) = handlers.try_join_next() {
                record_handler_result(joined, first_error);
            }

            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(error) if is_transient(&error) => {
                    debug!(%error, "transient accept error, backing off");
                    time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
                Err(error) => return Err(ServerError::Accept(error)),
            };

            match Arc::clone(&self.limit_connections).try_acquire_owned() {
                Ok(permit) => {
                    let handler = ConnectionHandler::new(
                        stream,
                        addr,
                        self.dispatcher.clone(),
                        self.buffer_size,
                        self.idle_timeout,
                        Shutdown::new(notify_shutdown.subscribe()),
                    );

                    handlers.spawn(async move {
                        let result = handler.run().await;
                        drop(permit);
                        result
                    });
                }
                Err(_) => {
                    debug!(client = %addr, "maximum connections reached, rejecting connection");
                    drop(stream);
                }
            }
        }
    }
}

/// Folds one joined handler result into the first-error slot.
fn record_handler_result(
    joined: Result<Result<(), ConnectionError>, JoinError>,
    first_error: &mut Option<ConnectionError>,
) {
    let result = match joined {
        Ok(result) => result,
        // The in-handler catch_unwind is the primary fault boundary;
        // this covers a panic escaping the task itself.
        Err(join_error) if join_error.is_panic() => {
            Err(ConnectionError::PanicRecovered(join_error.to_string()))
        }
        Err(_) => Ok(()),
    };

    if let Err(error) = result {
        warn!(%error, "connection handler failed");
        if first_error.is_none() {
            *first_error = Some(error);
        }
    }
}

/// Accept errors worth retrying after a short pause.
fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::Interrupted
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;

    async fn start_server(
        config: ServerConfig,
    ) -> (
        SocketAddr,
        oneshot::Sender<()>,
        JoinHandle<Result<(), ServerError>>,
    ) {
        let storage = Arc::new(StorageEngine::new());
        let server = Server::bind(config, storage).await.unwrap();
        let addr = server.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            server
                .serve(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        (addr, shutdown_tx, handle)
    }

    fn test_config() -> ServerConfig {
        ServerConfig {
            address: "127.0.0.1:0".to_string(),
            ..ServerConfig::default()
        }
    }

    async fn roundtrip(client: &mut TcpStream, request: &str) -> String {
        client.write_all(request.as_bytes()).await.unwrap();
        let mut buf = [0u8; 256];
        let n = client.read(&mut buf).await.unwrap();
        String::from_utf8_lossy(&buf[..n]).into_owned()
    }

    #[tokio::test]
    async fn test_bind_rejects_invalid_configuration() {
        let storage = Arc::new(StorageEngine::new());

        let config = ServerConfig {
            max_connections: 0,
            ..test_config()
        };
        assert!(matches!(
            Server::bind(config, Arc::clone(&storage)).await,
            Err(ServerError::InvalidConfiguration(_))
        ));

        let config = ServerConfig {
            buffer_size: 0,
            ..test_config()
        };
        assert!(matches!(
            Server::bind(config, storage).await,
            Err(ServerError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_serves_commands_end_to_end() {
        let (addr, shutdown_tx, handle) = start_server(test_config()).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        assert_eq!(roundtrip(&mut client, "SET alpha 1").await, "OK");
        assert_eq!(roundtrip(&mut client, "GET alpha").await, "VALUE 1");
        assert_eq!(roundtrip(&mut client, "DEL alpha").await, "DELETED");
        assert_eq!(roundtrip(&mut client, "GET alpha").await, "NOT_FOUND");
        assert_eq!(
            roundtrip(&mut client, "GET").await,
            "invalid quantity of arguments"
        );
        // The malformed request did not close the connection.
        assert_eq!(roundtrip(&mut client, "SET beta 2").await, "OK");

        drop(client);
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_admission_bound_rejects_excess_connection() {
        let config = ServerConfig {
            max_connections: 1,
            ..test_config()
        };
        let (addr, shutdown_tx, handle) = start_server(config).await;

        // First connection takes the only admission slot.
        let mut first = TcpStream::connect(addr).await.unwrap();
        assert_eq!(roundtrip(&mut first, "SET k v").await, "OK");

        // Second connection is accepted at the TCP level, then closed
        // without being served.
        let mut second = TcpStream::connect(addr).await.unwrap();
        let mut buf = [0u8; 16];
        let n = tokio::time::timeout(Duration::from_secs(2), second.read(&mut buf))
            .await
            .expect("server did not close the rejected connection")
            .unwrap();
        assert_eq!(n, 0);

        // Releasing the first connection frees the slot again.
        drop(first);
        // Give the server a moment to reap the handler and its permit.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let mut third = TcpStream::connect(addr).await.unwrap();
        assert_eq!(roundtrip(&mut third, "GET k").await, "VALUE v");

        drop(third);
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_graceful_shutdown_closes_live_connections() {
        let (addr, shutdown_tx, handle) = start_server(test_config()).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        assert_eq!(roundtrip(&mut client, "SET k v").await, "OK");

        shutdown_tx.send(()).unwrap();

        // The idle handler observes the signal and closes cleanly.
        let mut buf = [0u8; 16];
        let n = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .expect("handler did not observe shutdown")
            .unwrap();
        assert_eq!(n, 0);

        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_clients_share_the_store() {
        let (addr, shutdown_tx, handle) = start_server(test_config()).await;

        let mut tasks = Vec::new();
        for i in 0..8 {
            tasks.push(tokio::spawn(async move {
                let mut client = TcpStream::connect(addr).await.unwrap();
                roundtrip(&mut client, &format!("SET contended {i}")).await
            }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap(), "OK");
        }

        // Exactly one of the written values survives.
        let mut client = TcpStream::connect(addr).await.unwrap();
        let reply = roundtrip(&mut client, "GET contended").await;
        let survivors: Vec<String> = (0..8).map(|i| format!("VALUE {i}")).collect();
        assert!(survivors.contains(&reply), "unexpected reply: {reply}");

        drop(client);
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_idle_timeout_reported_as_handler_error() {
        let config = ServerConfig {
            idle_timeout: Some(Duration::from_millis(100)),
            ..test_config()
        };
        let (addr, shutdown_tx, handle) = start_server(config).await;

        let client = TcpStream::connect(addr).await.unwrap();
        // Say nothing until the idle window elapses.
        tokio::time::sleep(Duration::from_millis(300)).await;
        drop(client);

        shutdown_tx.send(()).unwrap();
        let result = handle.await.unwrap();
        assert!(matches!(
            result,
            Err(ServerError::Connection(ConnectionError::Timeout))
        ));
    }
}
