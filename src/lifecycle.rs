//! Lifecycle controller
//!
//! Connection open/close and the host-only meeting controls. Losing the
//! host ends the meeting; losing a participant only removes it from the room.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::error::SessionError;
use crate::meeting::Meeting;
use crate::message::ServerMessage;
use crate::server::MeetingServer;
use crate::types::{ConnectionId, MeetingCode, Role};

impl MeetingServer {
    /// Handle new transport connection
    ///
    /// Only the outbound queue is registered; session state comes later.
    pub(crate) fn handle_connect(
        &mut self,
        connection_id: ConnectionId,
        sender: mpsc::Sender<ServerMessage>,
    ) {
        info!("Connection {} opened", connection_id);
        self.relay.register(connection_id, sender);
        debug!(
            "Live connections: {}, Total meetings: {}",
            self.relay.live_count(),
            self.meetings.len()
        );
    }

    /// Handle transport disconnection
    ///
    /// Meeting-side cleanup runs first and the connection's own entry is
    /// removed last. Calling this twice is harmless.
    pub(crate) fn handle_disconnect(&mut self, connection_id: ConnectionId) {
        info!("Connection {} closed", connection_id);

        if let Some(entry) = self.connections.get(connection_id).cloned() {
            self.release_membership(&entry, &[connection_id]);
            self.connections.remove(connection_id);
        }

        self.relay.unregister(connection_id);

        debug!(
            "Live connections: {}, Total meetings: {}",
            self.relay.live_count(),
            self.meetings.len()
        );
    }

    /// Handle meeting creation
    ///
    /// By default an active meeting under the same code is silently replaced.
    pub(crate) fn handle_start_meeting(
        &mut self,
        connection_id: ConnectionId,
        meeting_code: MeetingCode,
        user_id: String,
    ) -> Result<(), SessionError> {
        if self.policy.reject_duplicate_codes {
            let taken = self
                .meetings
                .get(&meeting_code)
                .is_some_and(|m| !m.is_host(connection_id));
            if taken {
                return Err(SessionError::CodeAlreadyActive(meeting_code));
            }
        }

        // A connection belongs to at most one meeting
        if let Some(previous) = self.connections.get(connection_id).cloned() {
            self.release_membership(&previous, &[connection_id]);
        }

        let meeting = Meeting::new(meeting_code.clone(), connection_id);
        if let Some(replaced) = self.meetings.put(meeting) {
            warn!(
                "Meeting {} replaced (previous host {})",
                meeting_code, replaced.host
            );
        }
        self.connections
            .put(Connection::host(connection_id, user_id, meeting_code.clone()));

        info!("Meeting {} started by host {}", meeting_code, connection_id);

        self.relay
            .send_to(connection_id, ServerMessage::meeting_started(meeting_code));
        Ok(())
    }

    /// Handle host removing a participant
    pub(crate) fn handle_kick_participant(
        &mut self,
        host_id: ConnectionId,
        target: ConnectionId,
    ) -> Result<(), SessionError> {
        let meeting_code = self.authorize_host(host_id)?;

        let is_member = self
            .meetings
            .get(&meeting_code)
            .is_some_and(|m| m.has_participant(target));
        if !is_member {
            return Err(SessionError::UnknownTarget(target));
        }

        self.relay.send_to(target, ServerMessage::KickedByHost);

        if let Some(meeting) = self.meetings.get_mut(&meeting_code) {
            meeting.remove_participant(target);
        }
        if self.policy.clear_kicked_entry {
            self.connections.remove(target);
        }

        info!("Participant {} kicked from meeting {}", target, meeting_code);

        self.relay.broadcast_to_meeting(
            &self.meetings,
            &meeting_code,
            ServerMessage::ParticipantLeft { sid: target },
            &[],
        );
        Ok(())
    }

    /// Handle host ending the meeting
    ///
    /// The host's own entry survives; it may start another meeting.
    pub(crate) fn handle_end_meeting(&mut self, host_id: ConnectionId) -> Result<(), SessionError> {
        let meeting_code = self.authorize_host(host_id)?;

        self.relay
            .broadcast_to_meeting(&self.meetings, &meeting_code, ServerMessage::MeetingEnded, &[]);
        if let Some(meeting) = self.meetings.remove(&meeting_code) {
            info!(
                "Meeting {} ended by host {} after {:?}",
                meeting_code,
                host_id,
                meeting.created_at.elapsed()
            );
        }
        Ok(())
    }

    /// Code of the meeting `connection_id` currently hosts
    ///
    /// The entry must carry the host role and the meeting under that code
    /// must still name this connection as its host.
    pub(crate) fn authorize_host(
        &self,
        connection_id: ConnectionId,
    ) -> Result<MeetingCode, SessionError> {
        let entry = self
            .connections
            .get(connection_id)
            .filter(|c| c.is_host())
            .ok_or(SessionError::NotAuthorized)?;

        let hosts_meeting = self
            .meetings
            .get(&entry.meeting_code)
            .is_some_and(|m| m.is_host(connection_id));
        if !hosts_meeting {
            return Err(SessionError::NotAuthorized);
        }

        Ok(entry.meeting_code.clone())
    }

    /// Helper: undo the meeting side of a connection's membership
    ///
    /// A host ends its meeting for everyone; a participant is removed and the
    /// rest of the room is told. Connections in `exclude` get no notification.
    /// The connection's own entry is left to the caller.
    pub(crate) fn release_membership(&mut self, entry: &Connection, exclude: &[ConnectionId]) {
        let meeting_code = &entry.meeting_code;

        match entry.role {
            Role::Host => {
                let hosts_meeting = self
                    .meetings
                    .get(meeting_code)
                    .is_some_and(|m| m.is_host(entry.id));
                if !hosts_meeting {
                    return;
                }

                self.relay.broadcast_to_meeting(
                    &self.meetings,
                    meeting_code,
                    ServerMessage::MeetingEnded,
                    exclude,
                );
                if let Some(meeting) = self.meetings.remove(meeting_code) {
                    info!(
                        "Meeting {} ended (host {} left) after {:?}",
                        meeting_code,
                        entry.id,
                        meeting.created_at.elapsed()
                    );
                }
            }
            Role::Participant => {
                let removed = self
                    .meetings
                    .get_mut(meeting_code)
                    .is_some_and(|m| m.remove_participant(entry.id));
                if !removed {
                    return;
                }

                info!("Participant {} left meeting {}", entry.id, meeting_code);
                self.relay.broadcast_to_meeting(
                    &self.meetings,
                    meeting_code,
                    ServerMessage::ParticipantLeft { sid: entry.id },
                    exclude,
                );
            }
        }
    }
}
