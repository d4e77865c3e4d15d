//! Error types for the meeting relay
//!
//! Defines fatal transport errors, recoverable session errors and
//! message send errors. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::types::{ConnectionId, MeetingCode};

/// Transport-level errors
///
/// Any of these ends the handler of the connection that hit it.
/// Session state is cleaned up through the normal disconnect path.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,
}

/// Session errors
///
/// Expected outcomes of racing or stale requests. None of them is fatal.
/// Only the variants with a `ServerMessage::rejection` reach the sender;
/// the rest are dropped silently.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Join attempted against a code with no active meeting
    #[error("Meeting not found: {0}")]
    UnknownMeeting(MeetingCode),

    /// Host-only operation attempted without holding the host role
    #[error("Not authorized")]
    NotAuthorized,

    /// Operation names a connection that is gone or not a member
    #[error("Unknown target: {0}")]
    UnknownTarget(ConnectionId),

    /// Meeting code already in use (only when duplicates are rejected)
    #[error("Meeting code already active: {0}")]
    CodeAlreadyActive(MeetingCode),

    /// Frame could not be decoded into a client message
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Message send errors
///
/// Occurs when a message cannot be queued for a connection.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The peer is not draining its queue
    #[error("Queue full")]
    QueueFull,
}
