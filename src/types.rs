//! Basic type definitions for the meeting relay
//!
//! Provides newtype wrappers for type safety:
//! - `ConnectionId`: UUID-based identifier of one live transport session
//! - `MeetingCode`: caller-chosen meeting name
//! - `Role`: what a connection is inside its meeting

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique connection identifier (newtype pattern)
///
/// Assigned by the transport handler when the socket is accepted and stable
/// for the connection's lifetime. Serialized as the bare UUID string, which is
/// the `sid` clients see on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Meeting code
///
/// Chosen by the host, compared exactly as given (case-sensitive).
/// Blank codes are rejected when the frame is decoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MeetingCode(String);

impl MeetingCode {
    /// Create a MeetingCode, rejecting blank input
    pub fn parse(code: impl Into<String>) -> Result<Self, String> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err("meeting code must not be empty".to_string());
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MeetingCode {
    type Error = String;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        Self::parse(code)
    }
}

impl From<MeetingCode> for String {
    fn from(code: MeetingCode) -> Self {
        code.0
    }
}

impl std::fmt::Display for MeetingCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role a connection holds in the meeting it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Participant,
}
