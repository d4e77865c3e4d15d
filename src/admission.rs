//! Admission workflow
//!
//! Two-phase entry: a join request is forwarded to the host, and only the
//! host's decision touches the registries. Pending requests are not tracked
//! here; the host keeps them.

use serde_json::Value;
use tracing::{debug, info};

use crate::connection::Connection;
use crate::error::SessionError;
use crate::message::{JoinAction, ServerMessage};
use crate::server::MeetingServer;
use crate::types::{ConnectionId, MeetingCode};

impl MeetingServer {
    /// Handle a join request
    ///
    /// An unknown code is answered with `join_error` and nothing else.
    pub(crate) fn handle_request_join(
        &mut self,
        connection_id: ConnectionId,
        meeting_code: MeetingCode,
        user_info: Value,
    ) -> Result<(), SessionError> {
        let Some(meeting) = self.meetings.get(&meeting_code) else {
            self.relay.send_to(connection_id, ServerMessage::join_error());
            return Err(SessionError::UnknownMeeting(meeting_code));
        };
        let host_id = meeting.host;

        info!(
            "Connection {} asked to join meeting {}",
            connection_id, meeting_code
        );

        self.relay.send_to(
            host_id,
            ServerMessage::JoinRequestReceived {
                sid: connection_id,
                user_info,
            },
        );
        self.relay
            .send_to(connection_id, ServerMessage::waiting_for_host());
        Ok(())
    }

    /// Handle the host's decision on a join request
    ///
    /// Ignored unless the sender hosts a live meeting. A requester that has
    /// since disconnected is skipped.
    pub(crate) fn handle_host_response(
        &mut self,
        host_id: ConnectionId,
        requester: ConnectionId,
        user_id: String,
        action: JoinAction,
    ) -> Result<(), SessionError> {
        let meeting_code = self.authorize_host(host_id)?;

        if requester == host_id || !self.relay.is_live(requester) {
            return Err(SessionError::UnknownTarget(requester));
        }

        match action {
            JoinAction::Deny => {
                info!(
                    "Host {} denied {} entry to meeting {}",
                    host_id, requester, meeting_code
                );
                self.relay.send_to(requester, ServerMessage::join_denied());
            }
            JoinAction::Allow => {
                self.admit(host_id, requester, user_id, meeting_code);
            }
        }
        Ok(())
    }

    /// Helper: add an allowed requester to the host's meeting
    fn admit(
        &mut self,
        host_id: ConnectionId,
        requester: ConnectionId,
        user_id: String,
        meeting_code: MeetingCode,
    ) {
        let already_member = self
            .meetings
            .get(&meeting_code)
            .is_some_and(|m| m.has_participant(requester));
        if already_member {
            debug!("{} is already in meeting {}", requester, meeting_code);
            return;
        }

        // A connection belongs to at most one meeting
        if let Some(previous) = self.connections.get(requester).cloned() {
            self.release_membership(&previous, &[requester]);
        }

        let Some(meeting) = self.meetings.get_mut(&meeting_code) else {
            return;
        };
        meeting.add_participant(requester);
        self.connections.put(Connection::participant(
            requester,
            user_id,
            meeting_code.clone(),
        ));

        info!(
            "Participant {} admitted to meeting {} ({} members)",
            requester,
            meeting_code,
            meeting.member_count()
        );

        self.relay.send_to(
            requester,
            ServerMessage::JoinAccepted {
                meeting_code: meeting_code.clone(),
            },
        );

        // The deciding host already knows
        self.relay.broadcast_to_meeting(
            &self.meetings,
            &meeting_code,
            ServerMessage::ParticipantJoined { sid: requester },
            &[requester, host_id],
        );
    }
}
