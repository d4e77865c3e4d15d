//! Meeting struct definition
//!
//! Represents one live meeting: a single host plus the admitted participants.

use std::time::Instant;

use crate::types::{ConnectionId, MeetingCode};

/// Multi-party meeting
///
/// The host is fixed for the meeting's lifetime; when the host goes away the
/// meeting ends instead of promoting someone. `participants` never contains
/// the host and never holds duplicates.
#[derive(Debug, Clone)]
pub struct Meeting {
    /// Meeting code for identification
    pub code: MeetingCode,
    /// Connection acting as host
    pub host: ConnectionId,
    /// Admitted participants, in admission order
    participants: Vec<ConnectionId>,
    /// Meeting creation time
    pub created_at: Instant,
}

impl Meeting {
    /// Create a new meeting with the given code and host
    pub fn new(code: MeetingCode, host: ConnectionId) -> Self {
        Self {
            code,
            host,
            participants: Vec::new(),
            created_at: Instant::now(),
        }
    }

    pub fn participants(&self) -> &[ConnectionId] {
        &self.participants
    }

    pub fn is_host(&self, connection_id: ConnectionId) -> bool {
        self.host == connection_id
    }

    pub fn has_participant(&self, connection_id: ConnectionId) -> bool {
        self.participants.contains(&connection_id)
    }

    /// Admit a participant
    ///
    /// Returns false if the connection is the host or already admitted.
    pub fn add_participant(&mut self, connection_id: ConnectionId) -> bool {
        if self.is_host(connection_id) || self.has_participant(connection_id) {
            return false;
        }
        self.participants.push(connection_id);
        true
    }

    /// Remove a participant
    ///
    /// Returns true if the connection was a participant.
    pub fn remove_participant(&mut self, connection_id: ConnectionId) -> bool {
        let before = self.participants.len();
        self.participants.retain(|id| *id != connection_id);
        self.participants.len() != before
    }

    /// Everyone in the room: host first, then participants
    pub fn members(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        std::iter::once(self.host).chain(self.participants.iter().copied())
    }

    /// Get the number of connections in the room, host included
    pub fn member_count(&self) -> usize {
        self.participants.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code() -> MeetingCode {
        MeetingCode::parse("ABC").unwrap()
    }

    #[test]
    fn test_meeting_creation() {
        let host_id = ConnectionId::new();
        let meeting = Meeting::new(code(), host_id);

        assert_eq!(meeting.code, code());
        assert!(meeting.is_host(host_id));
        assert!(meeting.participants().is_empty());
        assert_eq!(meeting.member_count(), 1);
    }

    #[test]
    fn test_host_cannot_be_participant() {
        let host_id = ConnectionId::new();
        let mut meeting = Meeting::new(code(), host_id);

        assert!(!meeting.add_participant(host_id));
        assert!(!meeting.has_participant(host_id));
    }

    #[test]
    fn test_no_duplicate_participants() {
        let mut meeting = Meeting::new(code(), ConnectionId::new());
        let guest = ConnectionId::new();

        assert!(meeting.add_participant(guest));
        assert!(!meeting.add_participant(guest));
        assert_eq!(meeting.participants(), &[guest]);
    }

    #[test]
    fn test_remove_participant() {
        let mut meeting = Meeting::new(code(), ConnectionId::new());
        let p1 = ConnectionId::new();
        let p2 = ConnectionId::new();
        meeting.add_participant(p1);
        meeting.add_participant(p2);

        assert!(meeting.remove_participant(p1));
        assert!(!meeting.remove_participant(p1));
        assert_eq!(meeting.participants(), &[p2]);
    }

    #[test]
    fn test_members_include_host() {
        let host_id = ConnectionId::new();
        let mut meeting = Meeting::new(code(), host_id);
        let guest = ConnectionId::new();
        meeting.add_participant(guest);

        let members: Vec<_> = meeting.members().collect();
        assert_eq!(members, vec![host_id, guest]);
        assert_eq!(meeting.member_count(), 2);
    }
}
