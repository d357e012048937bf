//! linekv - A Line-Oriented In-Memory Key-Value Server
//!
//! This is the main entry point for the linekv server. It parses
//! command-line options, sets up logging, and runs the server until a
//! shutdown signal arrives.

use linekv::server::{Server, ServerConfig};
use linekv::storage::StorageEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Parses the server configuration from command-line arguments.
fn config_from_args() -> ServerConfig {
    let mut config = ServerConfig::default();
    let args: Vec<String> = std::env::args().collect();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--addr" | "-a" => {
                if i + 1 < args.len() {
                    config.address = args[i + 1].clone();
                    i += 2;
                } else {
                    eprintln!("Error: --addr requires a value");
                    std::process::exit(1);
                }
            }
            "--max-connections" => {
                if i + 1 < args.len() {
                    config.max_connections = args[i + 1].parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid max connections");
                        std::process::exit(1);
                    });
                    i += 2;
                } else {
                    eprintln!("Error: --max-connections requires a value");
                    std::process::exit(1);
                }
            }
            "--buffer-size" => {
                if i + 1 < args.len() {
                    config.buffer_size = args[i + 1].parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid buffer size");
                        std::process::exit(1);
                    });
                    i += 2;
                } else {
                    eprintln!("Error: --buffer-size requires a value");
                    std::process::exit(1);
                }
            }
            "--idle-timeout" => {
                if i + 1 < args.len() {
                    let seconds: u64 = args[i + 1].parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid idle timeout");
                        std::process::exit(1);
                    });
                    // 0 disables the idle deadline entirely.
                    config.idle_timeout = if seconds == 0 {
                        None
                    } else {
                        Some(Duration::from_secs(seconds))
                    };
                    i += 2;
                } else {
                    eprintln!("Error: --idle-timeout requires a value");
                    std::process::exit(1);
                }
            }
            "--help" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-v" => {
                println!("linekv version {}", linekv::VERSION);
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    config
}

fn print_help() {
    println!(
        r#"
linekv - A Line-Oriented In-Memory Key-Value Server

USAGE:
    linekv [OPTIONS]

OPTIONS:
    -a, --addr <ADDR>             Address to bind to (default: 127.0.0.1:3323)
        --max-connections <N>     Maximum concurrent connections (default: 100)
        --buffer-size <BYTES>     Per-connection read buffer size (default: 4096)
        --idle-timeout <SECONDS>  Idle timeout, 0 to disable (default: 300)
    -v, --version                 Print version information
        --help                    Print this help message

EXAMPLES:
    linekv                               # Start on 127.0.0.1:3323
    linekv --addr 0.0.0.0:3323           # Listen on all interfaces
    linekv --max-connections 1000        # Allow more concurrent clients

CONNECTING:
    Any line-oriented TCP client works, e.g. netcat:
    $ nc 127.0.0.1 3323
    SET name linekv
    OK
    GET name
    VALUE linekv
"#
    );
}

fn print_banner(config: &ServerConfig) {
    println!(
        r#"
    ██╗     ██╗███╗   ██╗███████╗██╗  ██╗██╗   ██╗
    ██║     ██║████╗  ██║██╔════╝██║ ██╔╝██║   ██║
    ██║     ██║██╔██╗ ██║█████╗  █████╔╝ ██║   ██║
    ██║     ██║██║╚██╗██║██╔══╝  ██╔═██╗ ╚██╗ ██╔╝
    ███████╗██║██║ ╚████║███████╗██║  ██╗ ╚████╔╝
    ╚══════╝╚═╝╚═╝  ╚═══╝╚══════╝╚═╝  ╚═╝  ╚═══╝

linekv v{} - Line-Oriented In-Memory Key-Value Server
──────────────────────────────────────────────────────
Server starting on {}
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        linekv::VERSION,
        config.address
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = config_from_args();

    // Set up logging
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // Print the banner
    print_banner(&config);

    // Create the storage engine (shared across all connections)
    let storage = Arc::new(StorageEngine::new());
    info!("Storage engine initialized");

    // Validate the configuration and bind the listener
    let server = Server::bind(config, storage).await?;

    // Serve until Ctrl+C
    let shutdown = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received, stopping server...");
    };

    server.serve(shutdown).await?;

    info!("Service stopped");
    Ok(())
}
