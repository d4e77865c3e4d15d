//! Relay engine
//!
//! Owns the outbound queue of every live connection and delivers targeted
//! messages and meeting broadcasts. Delivery is fire-and-forget and never
//! waits: a message for a connection that is gone, whose queue has closed,
//! or whose queue is full because the peer stopped reading, is dropped.

use std::collections::HashMap;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::registry::MeetingRegistry;
use crate::types::{ConnectionId, MeetingCode};

/// Live transport handles: ConnectionId -> outbound queue
#[derive(Debug, Default)]
pub struct Relay {
    peers: HashMap<ConnectionId, mpsc::Sender<ServerMessage>>,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the outbound queue of a freshly connected transport
    pub fn register(&mut self, connection_id: ConnectionId, sender: mpsc::Sender<ServerMessage>) {
        self.peers.insert(connection_id, sender);
    }

    pub fn unregister(&mut self, connection_id: ConnectionId) {
        self.peers.remove(&connection_id);
    }

    pub fn is_live(&self, connection_id: ConnectionId) -> bool {
        self.peers.contains_key(&connection_id)
    }

    pub fn live_count(&self) -> usize {
        self.peers.len()
    }

    /// Send a message to one connection
    ///
    /// Returns whether the message was queued. Not being queued is never an
    /// error for the caller.
    pub fn send_to(&self, connection_id: ConnectionId, msg: ServerMessage) -> bool {
        match self.deliver(connection_id, msg) {
            Ok(()) => true,
            Err(e) => {
                debug!("Dropped message for {}: {}", connection_id, e);
                false
            }
        }
    }

    /// Send a message to the host and participants of a meeting
    ///
    /// Connections in `exclude` are skipped. A missing meeting is a no-op.
    /// Returns the number of recipients the message was queued for.
    pub fn broadcast_to_meeting(
        &self,
        meetings: &MeetingRegistry,
        code: &MeetingCode,
        msg: ServerMessage,
        exclude: &[ConnectionId],
    ) -> usize {
        let Some(meeting) = meetings.get(code) else {
            debug!("Broadcast to missing meeting {} dropped", code);
            return 0;
        };

        let recipients: Vec<ConnectionId> = meeting
            .members()
            .filter(|id| !exclude.contains(id))
            .collect();

        let mut delivered = 0;
        for id in recipients {
            if self.send_to(id, msg.clone()) {
                delivered += 1;
            }
        }
        delivered
    }

    fn deliver(&self, connection_id: ConnectionId, msg: ServerMessage) -> Result<(), SendError> {
        let sender = self
            .peers
            .get(&connection_id)
            .ok_or(SendError::ChannelClosed)?;
        sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => {
                warn!("Outbound queue full for {}, dropping message", connection_id);
                SendError::QueueFull
            }
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meeting::Meeting;

    fn code() -> MeetingCode {
        MeetingCode::parse("ABC").unwrap()
    }

    #[tokio::test]
    async fn test_send_to_live_connection() {
        let mut relay = Relay::new();
        let id = ConnectionId::new();
        let (tx, mut rx) = mpsc::channel(8);
        relay.register(id, tx);

        assert!(relay.send_to(id, ServerMessage::MeetingEnded));
        assert_eq!(rx.recv().await, Some(ServerMessage::MeetingEnded));
    }

    #[tokio::test]
    async fn test_send_to_unknown_connection_is_dropped() {
        let relay = Relay::new();
        assert!(!relay.send_to(ConnectionId::new(), ServerMessage::MeetingEnded));
    }

    #[tokio::test]
    async fn test_send_to_closed_queue_is_dropped() {
        let mut relay = Relay::new();
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(8);
        relay.register(id, tx);
        drop(rx);

        assert!(!relay.send_to(id, ServerMessage::KickedByHost));
    }

    #[tokio::test]
    async fn test_send_to_full_queue_is_dropped() {
        let mut relay = Relay::new();
        let id = ConnectionId::new();
        let (tx, mut rx) = mpsc::channel(1);
        relay.register(id, tx);

        assert!(relay.send_to(id, ServerMessage::MeetingEnded));
        assert!(!relay.send_to(id, ServerMessage::KickedByHost));

        // The queued message survives; the overflow does not
        assert_eq!(rx.recv().await, Some(ServerMessage::MeetingEnded));
        assert!(rx.try_recv().is_err());
        assert!(relay.is_live(id));
    }

    #[tokio::test]
    async fn test_broadcast_respects_exclusion() {
        let mut relay = Relay::new();
        let mut meetings = MeetingRegistry::new();
        let host = ConnectionId::new();
        let guest = ConnectionId::new();

        let (host_tx, mut host_rx) = mpsc::channel(8);
        let (guest_tx, mut guest_rx) = mpsc::channel(8);
        relay.register(host, host_tx);
        relay.register(guest, guest_tx);

        let mut meeting = Meeting::new(code(), host);
        meeting.add_participant(guest);
        meetings.put(meeting);

        let delivered = relay
            .broadcast_to_meeting(&meetings, &code(), ServerMessage::MeetingEnded, &[guest]);

        assert_eq!(delivered, 1);
        assert_eq!(host_rx.recv().await, Some(ServerMessage::MeetingEnded));
        assert!(guest_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_to_missing_meeting_is_noop() {
        let relay = Relay::new();
        let meetings = MeetingRegistry::new();
        let delivered = relay
            .broadcast_to_meeting(&meetings, &code(), ServerMessage::MeetingEnded, &[]);
        assert_eq!(delivered, 0);
    }
}
