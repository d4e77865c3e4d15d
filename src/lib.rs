//! Meeting Signaling Relay Library
//!
//! A WebSocket signaling relay for multi-party video meetings built with
//! tokio-tungstenite, using the Actor pattern for session state.
//!
//! # Features
//! - Host-started meetings identified by a caller-chosen code
//! - Host-gated admission (join request, allow/deny)
//! - Host controls: kick participant, end meeting
//! - Relay of WebRTC offer/answer/ICE payloads between peers
//! - Cascading cleanup on disconnect (host loss ends the meeting)
//!
//! Media never passes through the relay; only signaling metadata does.
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `MeetingServer` is the central actor owning the connection registry,
//!   the meeting registry and the relay's outbound queues
//! - Each connection has a `handler` task communicating with the server
//! - No locks needed - every operation runs to completion inside the actor
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use meeting_relay::{handle_connection, MeetingServer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(MeetingServer::new(cmd_rx).run());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         let cmd_tx = cmd_tx.clone();
//!         tokio::spawn(handle_connection(stream, cmd_tx, 32));
//!     }
//! }
//! ```

mod admission;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
mod lifecycle;
pub mod meeting;
pub mod message;
pub mod registry;
pub mod relay;
pub mod server;
pub mod types;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use config::{Config, ConfigError, SessionPolicy};
pub use connection::Connection;
pub use error::{AppError, SendError, SessionError};
pub use handler::handle_connection;
pub use meeting::Meeting;
pub use message::{ClientMessage, ErrorCode, JoinAction, ServerMessage};
pub use registry::{check_invariants, ConnectionRegistry, InvariantViolation, MeetingRegistry};
pub use relay::Relay;
pub use server::{MeetingServer, ServerCommand};
pub use types::{ConnectionId, MeetingCode, Role};
