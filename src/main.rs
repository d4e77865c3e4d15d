//! Meeting Signaling Relay - Entry Point
//!
//! Starts the TCP listener and MeetingServer actor, accepting connections.

use std::env;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use meeting_relay::{handle_connection, Config, MeetingServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=meeting_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("meeting_relay=info")),
        )
        .init();

    let mut config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    // Bind address on the command line wins over the environment
    if let Some(addr) = env::args().nth(1) {
        config.bind_address = addr;
    }

    info!("Configuration loaded: {:?}", config);

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!("Meeting relay listening on {}", config.bind_address);

    let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer);
    let server = MeetingServer::new(cmd_rx).with_policy(config.policy);
    tokio::spawn(server.run());

    info!("MeetingServer actor started");

    // Connection accept loop
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let cmd_tx = cmd_tx.clone();
                let outbound_buffer = config.outbound_buffer;

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, cmd_tx, outbound_buffer).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
