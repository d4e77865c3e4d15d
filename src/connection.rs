//! Connection entry definition
//!
//! Session state of one connection that has hosted or been admitted
//! to a meeting. Connections that never got that far have no entry.

use crate::types::{ConnectionId, MeetingCode, Role};

/// Connection Registry entry
///
/// Records which meeting a connection belongs to and in what role.
/// The `user_id` is whatever the caller supplied; it is not authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Transport-assigned identifier
    pub id: ConnectionId,
    /// Caller-supplied user identifier
    pub user_id: String,
    /// Meeting this connection belongs to
    pub meeting_code: MeetingCode,
    /// Host or participant
    pub role: Role,
}

impl Connection {
    /// Entry for a connection that just started a meeting
    pub fn host(id: ConnectionId, user_id: String, meeting_code: MeetingCode) -> Self {
        Self {
            id,
            user_id,
            meeting_code,
            role: Role::Host,
        }
    }

    /// Entry for a connection the host just admitted
    pub fn participant(id: ConnectionId, user_id: String, meeting_code: MeetingCode) -> Self {
        Self {
            id,
            user_id,
            meeting_code,
            role: Role::Participant,
        }
    }

    pub fn is_host(&self) -> bool {
        self.role == Role::Host
    }
}
