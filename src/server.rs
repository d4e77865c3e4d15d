//! MeetingServer Actor implementation
//!
//! The central actor that owns all session state: the connection registry,
//! the meeting registry and the relay's live connection handles. Commands
//! are processed one at a time, so each operation's check-mutate-notify
//! sequence is atomic with respect to every other connection, and commands
//! from the same connection are handled in the order they were sent.
//!
//! The operations themselves live in `admission` (join requests and host
//! decisions) and `lifecycle` (connect, disconnect, start, kick, end).

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::config::SessionPolicy;
use crate::error::SessionError;
use crate::message::{JoinAction, ServerMessage};
use crate::registry::{check_invariants, ConnectionRegistry, MeetingRegistry};
use crate::relay::Relay;
use crate::types::{ConnectionId, MeetingCode};

/// Commands sent from handlers to the MeetingServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New transport connection
    Connect {
        connection_id: ConnectionId,
        sender: mpsc::Sender<ServerMessage>,
    },
    /// Transport connection closed
    Disconnect { connection_id: ConnectionId },
    /// Open a meeting with the sender as host
    StartMeeting {
        connection_id: ConnectionId,
        meeting_code: MeetingCode,
        user_id: String,
    },
    /// Ask to be admitted to a meeting
    RequestJoin {
        connection_id: ConnectionId,
        meeting_code: MeetingCode,
        user_info: Value,
    },
    /// Host admits or turns away a requester
    HostResponse {
        connection_id: ConnectionId,
        requester: ConnectionId,
        user_id: String,
        action: JoinAction,
    },
    /// Host removes a participant
    KickParticipant {
        connection_id: ConnectionId,
        target: ConnectionId,
    },
    /// Host ends the meeting
    EndMeeting { connection_id: ConnectionId },
    /// Relay a WebRTC payload to one peer
    WebrtcSignal {
        connection_id: ConnectionId,
        target: ConnectionId,
        payload: Value,
    },
}

/// The main MeetingServer actor
pub struct MeetingServer {
    pub(crate) connections: ConnectionRegistry,
    pub(crate) meetings: MeetingRegistry,
    pub(crate) relay: Relay,
    pub(crate) policy: SessionPolicy,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl MeetingServer {
    /// Create a new MeetingServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self {
            connections: ConnectionRegistry::new(),
            meetings: MeetingRegistry::new(),
            relay: Relay::new(),
            policy: SessionPolicy::default(),
            receiver,
        }
    }

    /// Replace the default session policy
    pub fn with_policy(mut self, policy: SessionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    pub fn meetings(&self) -> &MeetingRegistry {
        &self.meetings
    }

    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    /// Run the MeetingServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("MeetingServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("MeetingServer shutting down");
    }

    /// Process a single command
    ///
    /// Never waits on a peer: outbound delivery only queues or drops.
    pub fn handle_command(&mut self, cmd: ServerCommand) {
        let (connection_id, result) = match cmd {
            ServerCommand::Connect {
                connection_id,
                sender,
            } => {
                self.handle_connect(connection_id, sender);
                (connection_id, Ok(()))
            }
            ServerCommand::Disconnect { connection_id } => {
                self.handle_disconnect(connection_id);
                (connection_id, Ok(()))
            }
            ServerCommand::StartMeeting {
                connection_id,
                meeting_code,
                user_id,
            } => {
                let result = self.handle_start_meeting(connection_id, meeting_code, user_id);
                (connection_id, result)
            }
            ServerCommand::RequestJoin {
                connection_id,
                meeting_code,
                user_info,
            } => {
                let result = self.handle_request_join(connection_id, meeting_code, user_info);
                (connection_id, result)
            }
            ServerCommand::HostResponse {
                connection_id,
                requester,
                user_id,
                action,
            } => {
                let result = self.handle_host_response(connection_id, requester, user_id, action);
                (connection_id, result)
            }
            ServerCommand::KickParticipant {
                connection_id,
                target,
            } => {
                let result = self.handle_kick_participant(connection_id, target);
                (connection_id, result)
            }
            ServerCommand::EndMeeting { connection_id } => {
                let result = self.handle_end_meeting(connection_id);
                (connection_id, result)
            }
            ServerCommand::WebrtcSignal {
                connection_id,
                target,
                payload,
            } => {
                let result = self.handle_webrtc_signal(connection_id, target, payload);
                (connection_id, result)
            }
        };

        if let Err(err) = result {
            self.report(connection_id, err);
        }

        if cfg!(debug_assertions) {
            if let Err(violation) = check_invariants(&self.connections, &self.meetings) {
                error!("Registry invariant violated: {}", violation);
            }
        }
    }

    /// Relay an offer/answer/ICE payload to one peer
    ///
    /// The payload is forwarded as-is, tagged with the sender's ID.
    fn handle_webrtc_signal(
        &mut self,
        connection_id: ConnectionId,
        target: ConnectionId,
        payload: Value,
    ) -> Result<(), SessionError> {
        let msg = ServerMessage::WebrtcSignal {
            sender_sid: connection_id,
            payload,
        };
        if self.relay.send_to(target, msg) {
            Ok(())
        } else {
            Err(SessionError::UnknownTarget(target))
        }
    }

    /// Apply the error policy: tell the sender, or drop silently
    fn report(&self, connection_id: ConnectionId, err: SessionError) {
        if let Some(reply) = ServerMessage::rejection(&err) {
            debug!("Rejecting request from {}: {}", connection_id, err);
            self.relay.send_to(connection_id, reply);
        } else {
            debug!("Dropped request from {}: {}", connection_id, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::test_support::{drain, Harness};

    #[tokio::test]
    async fn test_webrtc_signal_relayed_with_sender() {
        let mut h = Harness::new();
        let (a, mut a_rx) = h.connect().await;
        let (b, mut b_rx) = h.connect().await;

        h.send(ServerCommand::WebrtcSignal {
            connection_id: a,
            target: b,
            payload: json!({"type": "offer", "sdp": "v=0"}),
        })
        .await;

        assert_eq!(
            drain(&mut b_rx),
            vec![ServerMessage::WebrtcSignal {
                sender_sid: a,
                payload: json!({"type": "offer", "sdp": "v=0"}),
            }]
        );
        assert!(drain(&mut a_rx).is_empty());
    }

    #[tokio::test]
    async fn test_webrtc_signal_to_disconnected_peer_is_noop() {
        let mut h = Harness::new();
        let (a, mut a_rx) = h.connect().await;
        let (b, _b_rx) = h.connect().await;
        h.send(ServerCommand::Disconnect { connection_id: b }).await;

        h.send(ServerCommand::WebrtcSignal {
            connection_id: a,
            target: b,
            payload: json!({"candidate": "x"}),
        })
        .await;

        assert!(drain(&mut a_rx).is_empty());
        assert_eq!(h.server.relay().live_count(), 1);
    }

    #[tokio::test]
    async fn test_stalled_peer_does_not_block_server() {
        let mut h = Harness::new();
        let (a, mut a_rx) = h.connect().await;

        // A peer whose queue holds one message and is never read
        let stalled = ConnectionId::new();
        let (stalled_tx, mut stalled_rx) = mpsc::channel(1);
        h.send(ServerCommand::Connect {
            connection_id: stalled,
            sender: stalled_tx,
        })
        .await;

        for n in 0..3 {
            h.send(ServerCommand::WebrtcSignal {
                connection_id: a,
                target: stalled,
                payload: json!({"candidate": n}),
            })
            .await;
        }

        // Other connections are still served
        h.start(a, "ABC").await;
        assert_eq!(
            drain(&mut a_rx),
            vec![ServerMessage::meeting_started(MeetingCode::parse("ABC").unwrap())]
        );

        // Only the first signal fit; overflow is dropped, the peer stays live
        assert_eq!(
            drain(&mut stalled_rx),
            vec![ServerMessage::WebrtcSignal {
                sender_sid: a,
                payload: json!({"candidate": 0}),
            }]
        );
        assert!(h.server.relay().is_live(stalled));
    }

    #[tokio::test]
    async fn test_run_loop_keeps_going_past_stalled_peer() {
        let (tx, rx) = mpsc::channel(16);
        let server = tokio::spawn(MeetingServer::new(rx).run());

        let host = ConnectionId::new();
        let stalled = ConnectionId::new();
        let (host_tx, mut host_rx) = mpsc::channel(16);
        let (stalled_tx, _stalled_rx) = mpsc::channel(1);
        tx.send(ServerCommand::Connect {
            connection_id: host,
            sender: host_tx,
        })
        .await
        .unwrap();
        tx.send(ServerCommand::Connect {
            connection_id: stalled,
            sender: stalled_tx,
        })
        .await
        .unwrap();
        for _ in 0..2 {
            tx.send(ServerCommand::WebrtcSignal {
                connection_id: host,
                target: stalled,
                payload: json!({"sdp": "v=0"}),
            })
            .await
            .unwrap();
        }
        tx.send(ServerCommand::StartMeeting {
            connection_id: host,
            meeting_code: MeetingCode::parse("ABC").unwrap(),
            user_id: "host".into(),
        })
        .await
        .unwrap();

        let reply = tokio::time::timeout(Duration::from_millis(500), host_rx.recv()).await;
        assert_eq!(
            reply.unwrap(),
            Some(ServerMessage::meeting_started(MeetingCode::parse("ABC").unwrap()))
        );

        drop(tx);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_run_loop_processes_commands_in_order() {
        let (tx, rx) = mpsc::channel(16);
        let server = tokio::spawn(MeetingServer::new(rx).run());

        let host = ConnectionId::new();
        let (host_tx, mut host_rx) = mpsc::channel(16);
        tx.send(ServerCommand::Connect {
            connection_id: host,
            sender: host_tx,
        })
        .await
        .unwrap();
        tx.send(ServerCommand::StartMeeting {
            connection_id: host,
            meeting_code: MeetingCode::parse("ABC").unwrap(),
            user_id: "host".into(),
        })
        .await
        .unwrap();
        tx.send(ServerCommand::EndMeeting {
            connection_id: host,
        })
        .await
        .unwrap();

        assert_eq!(
            host_rx.recv().await,
            Some(ServerMessage::meeting_started(MeetingCode::parse("ABC").unwrap()))
        );
        assert_eq!(host_rx.recv().await, Some(ServerMessage::MeetingEnded));

        drop(tx);
        server.await.unwrap();
    }
}
