//! Message protocol definitions
//!
//! JSON-based bidirectional message protocol using Serde's tagged enum
//! for type-safe serialization/deserialization. Field validation happens
//! here, at the transport boundary; the session core only ever sees
//! well-formed messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SessionError;
use crate::types::{ConnectionId, MeetingCode};

const JOIN_ERROR_MESSAGE: &str = "Invalid meeting code";
const WAITING_MESSAGE: &str = "Waiting for host to let you in...";
const JOIN_DENIED_MESSAGE: &str = "The host declined your request.";

/// Client → Server message
///
/// All messages from client to server. Uses tagged enum with snake_case naming.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a meeting under the given code and become its host
    StartMeeting {
        meeting_code: MeetingCode,
        user_id: String,
    },
    /// Ask the host of a meeting to be let in
    RequestJoin {
        meeting_code: MeetingCode,
        user_info: Value,
    },
    /// Host decision on a pending join request
    HostResponse {
        requester_sid: ConnectionId,
        action: JoinAction,
        user_id: String,
    },
    /// Host removes a participant
    KickParticipant { target_sid: ConnectionId },
    /// Host closes the meeting for everyone
    EndMeeting,
    /// Offer/answer/ICE payload for one peer
    WebrtcSignal {
        target_sid: ConnectionId,
        payload: Value,
    },
}

impl ClientMessage {
    /// Decode a text frame, rejecting missing or malformed fields
    pub fn decode(text: &str) -> Result<Self, SessionError> {
        serde_json::from_str(text).map_err(|e| SessionError::BadRequest(e.to_string()))
    }
}

/// Host decision for a join request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinAction {
    Allow,
    Deny,
}

/// Server → Client message
///
/// All messages from server to client. Uses tagged enum with snake_case naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection accepted, connection ID issued
    Connected { sid: ConnectionId },
    /// Meeting registered with the sender as host
    MeetingStarted {
        status: String,
        meeting_code: MeetingCode,
    },
    /// Join request named a meeting that does not exist
    JoinError { message: String },
    /// Someone is waiting to be admitted (host only)
    JoinRequestReceived { sid: ConnectionId, user_info: Value },
    /// Join request forwarded to the host
    WaitingForHost { message: String },
    /// Requester was admitted
    JoinAccepted { meeting_code: MeetingCode },
    /// A new participant is in the room
    ParticipantJoined { sid: ConnectionId },
    /// Requester was turned away
    JoinDenied { message: String },
    /// Recipient was removed by the host
    KickedByHost,
    /// A participant is no longer in the room
    ParticipantLeft { sid: ConnectionId },
    /// The meeting is over
    MeetingEnded,
    /// Relayed WebRTC payload
    WebrtcSignal {
        sender_sid: ConnectionId,
        payload: Value,
    },
    /// Request rejected
    Error { code: ErrorCode, message: String },
}

impl ServerMessage {
    pub fn meeting_started(meeting_code: MeetingCode) -> Self {
        Self::MeetingStarted {
            status: "success".to_string(),
            meeting_code,
        }
    }

    pub fn join_error() -> Self {
        Self::JoinError {
            message: JOIN_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn waiting_for_host() -> Self {
        Self::WaitingForHost {
            message: WAITING_MESSAGE.to_string(),
        }
    }

    pub fn join_denied() -> Self {
        Self::JoinDenied {
            message: JOIN_DENIED_MESSAGE.to_string(),
        }
    }
}

/// Error codes for ServerMessage::Error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Frame was not a valid client message
    BadRequest,
    /// Meeting code already taken by a live meeting
    CodeAlreadyActive,
}

impl ServerMessage {
    /// The reply a session error earns its sender, if any
    ///
    /// `UnknownMeeting` is answered by the admission workflow itself with a
    /// `join_error`. Unauthorized requests and stale targets get no reply.
    pub fn rejection(err: &SessionError) -> Option<Self> {
        let (code, message) = match err {
            SessionError::BadRequest(reason) => {
                (ErrorCode::BadRequest, format!("Invalid message format: {}", reason))
            }
            SessionError::CodeAlreadyActive(code) => (
                ErrorCode::CodeAlreadyActive,
                format!("Meeting '{}' is already active", code),
            ),
            SessionError::UnknownMeeting(_)
            | SessionError::NotAuthorized
            | SessionError::UnknownTarget(_) => return None,
        };
        Some(ServerMessage::Error { code, message })
    }
}
