//! Connection Handler
//!
//! Each accepted client gets its own handler task running a
//! read-dispatch-write loop until the client disconnects, the idle
//! timeout fires, or the server shuts down.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned (holding an admission permit)
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  Read request ──> Dispatch   │
//!    │       ▲              │       │
//!    │       │              ▼       │
//!    │       └────────── Write reply│
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. EOF / idle timeout / shutdown / I/O error / panic
//!        │
//!        ▼
//! 5. Handler task ends, permit released
//! ```
//!
//! ## Buffer Management
//!
//! A request is whatever one `read` call delivers into a fixed
//! `buffer_size`-byte buffer. A request longer than the buffer is
//! silently truncated - truncating `SET foo bar` to 4 bytes yields
//! `SET `, which then fails the argument-count check. Callers needing
//! larger payloads configure a larger buffer; the protocol has no
//! framing to do better.
//!
//! ## Failure Isolation
//!
//! Malformed commands are answered with the error text and the loop
//! continues. I/O failures and panics terminate only this connection:
//! the dispatch step runs inside `catch_unwind`, so one panicking
//! request never takes down the server.

use crate::commands::{CommandError, CommandHandler};
use crate::server::shutdown::Shutdown;
use bytes::BytesMut;
use std::any::Any;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Errors that terminate a connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Reading from the socket failed.
    #[error("failed to read from connection: {0}")]
    Read(#[source] std::io::Error),

    /// Writing to the socket failed.
    #[error("failed to write to connection: {0}")]
    Write(#[source] std::io::Error),

    /// The idle deadline elapsed while waiting on the socket.
    #[error("connection idle timeout expired")]
    Timeout,

    /// A panic escaped the request-processing path and was recovered.
    #[error("panic in request handler: {0}")]
    PanicRecovered(String),
}

/// Handles a single client connection.
///
/// Owns the socket, the fixed-size read buffer, a clone of the command
/// dispatcher (the storage engine behind it stays shared) and a
/// shutdown receiver.
#[derive(Debug)]
pub struct ConnectionHandler {
    /// The TCP stream for this connection
    stream: BufWriter<TcpStream>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Fixed-size buffer for incoming requests
    buffer: BytesMut,

    /// The command dispatcher
    dispatcher: CommandHandler,

    /// Read/write deadline; `None` disables it
    idle_timeout: Option<Duration>,

    /// Server-wide shutdown signal
    shutdown: Shutdown,
}

impl ConnectionHandler {
    /// Creates a new connection handler.
    ///
    /// `buffer_size` fixes the read buffer: it is never grown, which is
    /// what gives over-long requests their truncation semantics.
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        dispatcher: CommandHandler,
        buffer_size: usize,
        idle_timeout: Option<Duration>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::zeroed(buffer_size),
            dispatcher,
            idle_timeout,
            shutdown,
        }
    }

    /// Runs the connection to completion.
    ///
    /// # Errors
    ///
    /// Returns the terminating [`ConnectionError`] for I/O failures,
    /// idle timeouts and recovered panics. Peer EOF and server shutdown
    /// are clean terminations, not errors.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "client disconnected"),
            Err(error) => warn!(client = %self.addr, %error, "connection closed with error"),
        }

        result
    }

    /// The read-dispatch-write loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        while !self.shutdown.is_shutdown() {
            let n = tokio::select! {
                read = read_request(&mut self.stream, &mut self.buffer, self.idle_timeout) => read?,
                () = self.shutdown.recv() => {
                    debug!(client = %self.addr, "shutdown signal received");
                    return Ok(());
                }
            };

            if n == 0 {
                // Peer closed its end of the connection.
                return Ok(());
            }

            let raw = String::from_utf8_lossy(&self.buffer[..n]).into_owned();

            // A dispatch error is a reply, not a reason to hang up.
            let reply = match self.dispatch(&raw)? {
                Ok(reply) => reply,
                Err(error) => error.to_string(),
            };

            self.write_reply(&reply).await?;
        }

        Ok(())
    }

    /// Executes one request behind the per-request fault boundary.
    ///
    /// The outer `Result` carries a recovered panic; the inner one is
    /// the dispatcher's own verdict.
    fn dispatch(&self, raw: &str) -> Result<Result<String, CommandError>, ConnectionError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.dispatcher.execute(raw)))
            .map_err(|payload| ConnectionError::PanicRecovered(panic_message(payload.as_ref())))
    }

    /// Writes a reply back to the client, verbatim and unterminated.
    async fn write_reply(&mut self, reply: &str) -> Result<(), ConnectionError> {
        let idle_timeout = self.idle_timeout;
        let write = async {
            self.stream.write_all(reply.as_bytes()).await?;
            self.stream.flush().await
        };

        let written = match idle_timeout {
            Some(limit) => timeout(limit, write)
                .await
                .map_err(|_| ConnectionError::Timeout)?,
            None => write.await,
        };

        written.map_err(ConnectionError::Write)
    }
}

/// Reads one request with the idle deadline armed.
///
/// A single `read` call into the fixed buffer; whatever arrives is the
/// request. Returns the number of bytes read, 0 meaning peer EOF.
async fn read_request(
    stream: &mut BufWriter<TcpStream>,
    buffer: &mut BytesMut,
    idle_timeout: Option<Duration>,
) -> Result<usize, ConnectionError> {
    let read = stream.get_mut().read(&mut buffer[..]);

    let n = match idle_timeout {
        Some(limit) => timeout(limit, read)
            .await
            .map_err(|_| ConnectionError::Timeout)?,
        None => read.await,
    };

    n.map_err(ConnectionError::Read)
}

/// Renders a recovered panic payload as text.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageEngine;
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use tokio::sync::broadcast;

    /// Spins up a raw accept loop serving `ConnectionHandler`s.
    async fn create_test_server(
        buffer_size: usize,
        idle_timeout: Option<Duration>,
    ) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let storage = Arc::new(StorageEngine::new());
        let (notify_shutdown, _) = broadcast::channel(1);

        tokio::spawn(async move {
            // The sender lives as long as the accept loop.
            while let Ok((stream, client_addr)) = listener.accept().await {
                let handler = ConnectionHandler::new(
                    stream,
                    client_addr,
                    CommandHandler::new(Arc::clone(&storage)),
                    buffer_size,
                    idle_timeout,
                    Shutdown::new(notify_shutdown.subscribe()),
                );
                tokio::spawn(handler.run());
            }
        });

        addr
    }

    async fn roundtrip(client: &mut TcpStream, request: &str) -> String {
        client.write_all(request.as_bytes()).await.unwrap();
        let mut buf = [0u8; 256];
        let n = client.read(&mut buf).await.unwrap();
        String::from_utf8_lossy(&buf[..n]).into_owned()
    }

    #[tokio::test]
    async fn test_end_to_end_flow() {
        let addr = create_test_server(4096, None).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        assert_eq!(roundtrip(&mut client, "SET alpha 1").await, "OK");
        assert_eq!(roundtrip(&mut client, "GET alpha").await, "VALUE 1");
        assert_eq!(roundtrip(&mut client, "DEL alpha").await, "DELETED");
        assert_eq!(roundtrip(&mut client, "GET alpha").await, "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_malformed_command_keeps_connection_open() {
        let addr = create_test_server(4096, None).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        assert_eq!(
            roundtrip(&mut client, "GET").await,
            "invalid quantity of arguments"
        );
        assert_eq!(
            roundtrip(&mut client, "set x y").await,
            "invalid syntax of command"
        );
        assert_eq!(
            roundtrip(&mut client, "PUT x y").await,
            "invalid command"
        );

        // The same connection still serves valid requests.
        assert_eq!(roundtrip(&mut client, "SET beta 2").await, "OK");
        assert_eq!(roundtrip(&mut client, "GET beta").await, "VALUE 2");
    }

    #[tokio::test]
    async fn test_oversized_request_is_truncated() {
        // A 4-byte buffer truncates "SET foo bar" to "SET ", which then
        // reads as a wrong-argument-count request.
        let addr = create_test_server(4, None).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        assert_eq!(
            roundtrip(&mut client, "SET foo bar").await,
            "invalid quantity of arguments"
        );
    }

    #[tokio::test]
    async fn test_idle_connection_is_closed() {
        let addr = create_test_server(4096, Some(Duration::from_millis(100))).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        // Send nothing; the server closes the connection once the idle
        // window elapses.
        let mut buf = [0u8; 16];
        let n = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .expect("server did not close the idle connection")
            .unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_connections_are_independent() {
        let addr = create_test_server(4096, None).await;
        let mut first = TcpStream::connect(addr).await.unwrap();
        let mut second = TcpStream::connect(addr).await.unwrap();

        assert_eq!(roundtrip(&mut first, "SET shared one").await, "OK");
        // The store is shared; the connections are not.
        assert_eq!(roundtrip(&mut second, "GET shared").await, "VALUE one");

        drop(first);
        assert_eq!(roundtrip(&mut second, "GET shared").await, "VALUE one");
    }

    #[test]
    fn test_panic_message_rendering() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new("boom".to_string());
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
