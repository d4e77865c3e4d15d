//! Connection and Meeting registries
//!
//! Both maps are owned by the `MeetingServer` actor and only mutated from
//! its command loop, so every read-modify-write sequence of one command is
//! atomic with respect to all other connections. Lookup misses are ordinary
//! outcomes and come back as `Option`.

use std::collections::HashMap;

use thiserror::Error;

use crate::connection::Connection;
use crate::meeting::Meeting;
use crate::types::{ConnectionId, MeetingCode, Role};

/// Session entries keyed by connection
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: HashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `connection.id`
    pub fn put(&mut self, connection: Connection) -> Option<Connection> {
        self.entries.insert(connection.id, connection)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.entries.get(&id)
    }

    pub fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        self.entries.remove(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Live meetings keyed by code
#[derive(Debug, Default)]
pub struct MeetingRegistry {
    meetings: HashMap<MeetingCode, Meeting>,
}

impl MeetingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the meeting at `meeting.code`
    pub fn put(&mut self, meeting: Meeting) -> Option<Meeting> {
        self.meetings.insert(meeting.code.clone(), meeting)
    }

    pub fn get(&self, code: &MeetingCode) -> Option<&Meeting> {
        self.meetings.get(code)
    }

    pub fn get_mut(&mut self, code: &MeetingCode) -> Option<&mut Meeting> {
        self.meetings.get_mut(code)
    }

    pub fn remove(&mut self, code: &MeetingCode) -> Option<Meeting> {
        self.meetings.remove(code)
    }

    pub fn contains(&self, code: &MeetingCode) -> bool {
        self.meetings.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.meetings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meetings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Meeting> {
        self.meetings.values()
    }
}

/// A broken cross-registry invariant
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("host {host} of meeting {code} is also listed as a participant")]
    HostIsParticipant { code: MeetingCode, host: ConnectionId },

    #[error("member {member} of meeting {code} has no matching registry entry")]
    DanglingMember {
        code: MeetingCode,
        member: ConnectionId,
    },
}

/// Verify the cross-registry invariants
///
/// Every host and participant of a live meeting must have an entry pointing
/// back at that meeting with the matching role. An entry names a single
/// meeting, so this also rules out membership in two meetings. Entries that
/// point at a meeting which no longer lists them (ended meetings, kicked
/// participants) are allowed.
pub fn check_invariants(
    connections: &ConnectionRegistry,
    meetings: &MeetingRegistry,
) -> Result<(), InvariantViolation> {
    for meeting in meetings.iter() {
        if meeting.has_participant(meeting.host) {
            return Err(InvariantViolation::HostIsParticipant {
                code: meeting.code.clone(),
                host: meeting.host,
            });
        }

        for member in meeting.members() {
            let expected = if member == meeting.host {
                Role::Host
            } else {
                Role::Participant
            };
            let matches = connections
                .get(member)
                .is_some_and(|c| c.meeting_code == meeting.code && c.role == expected);
            if !matches {
                return Err(InvariantViolation::DanglingMember {
                    code: meeting.code.clone(),
                    member,
                });
            }
        }
    }

    Ok(())
}
