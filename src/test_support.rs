//! Helpers for driving the actor directly in unit tests.

use tokio::sync::mpsc;

use crate::config::SessionPolicy;
use crate::message::{JoinAction, ServerMessage};
use crate::registry::check_invariants;
use crate::server::{MeetingServer, ServerCommand};
use crate::types::{ConnectionId, MeetingCode};

pub(crate) struct Harness {
    pub(crate) server: MeetingServer,
    _commands: mpsc::Sender<ServerCommand>,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self::with_policy(SessionPolicy::default())
    }

    pub(crate) fn with_policy(policy: SessionPolicy) -> Self {
        let (tx, rx) = mpsc::channel(16);
        Self {
            server: MeetingServer::new(rx).with_policy(policy),
            _commands: tx,
        }
    }

    /// Handle one command, then check the registries are still consistent
    pub(crate) async fn send(&mut self, cmd: ServerCommand) {
        self.server.handle_command(cmd);
        check_invariants(self.server.connections(), self.server.meetings()).unwrap();
    }

    pub(crate) async fn connect(&mut self) -> (ConnectionId, mpsc::Receiver<ServerMessage>) {
        let connection_id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(64);
        self.send(ServerCommand::Connect {
            connection_id,
            sender: tx,
        })
        .await;
        (connection_id, rx)
    }

    pub(crate) async fn start(&mut self, host: ConnectionId, code: &str) {
        self.send(ServerCommand::StartMeeting {
            connection_id: host,
            meeting_code: code_of(code),
            user_id: format!("user-{}", host),
        })
        .await;
    }

    pub(crate) async fn request(&mut self, requester: ConnectionId, code: &str) {
        self.send(ServerCommand::RequestJoin {
            connection_id: requester,
            meeting_code: code_of(code),
            user_info: serde_json::json!({"name": "guest"}),
        })
        .await;
    }

    pub(crate) async fn respond(
        &mut self,
        host: ConnectionId,
        requester: ConnectionId,
        action: JoinAction,
    ) {
        self.send(ServerCommand::HostResponse {
            connection_id: host,
            requester,
            user_id: format!("user-{}", requester),
            action,
        })
        .await;
    }

    /// Request and allow in one go
    pub(crate) async fn admit(&mut self, host: ConnectionId, requester: ConnectionId, code: &str) {
        self.request(requester, code).await;
        self.respond(host, requester, JoinAction::Allow).await;
    }
}

pub(crate) fn code_of(code: &str) -> MeetingCode {
    MeetingCode::parse(code).unwrap()
}

/// Everything currently queued for one connection
pub(crate) fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}
