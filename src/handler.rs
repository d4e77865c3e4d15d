//! WebSocket connection handler
//!
//! Handles individual client connections: WebSocket handshake,
//! frame decoding, and bidirectional communication with the MeetingServer.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::message::{ClientMessage, ServerMessage};
use crate::server::ServerCommand;
use crate::types::ConnectionId;

/// Handle a new TCP connection
///
/// Performs WebSocket handshake, sets up bidirectional communication,
/// and manages the connection lifecycle. `outbound_buffer` bounds the
/// queue of messages waiting to be written to this socket.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
    outbound_buffer: usize,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let connection_id = ConnectionId::new();
    info!("Connection {} accepted from {}", connection_id, peer_addr);

    // Channel for server -> client messages
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(outbound_buffer);

    // Register with MeetingServer
    if cmd_tx
        .send(ServerCommand::Connect {
            connection_id,
            sender: msg_tx.clone(),
        })
        .await
        .is_err()
    {
        error!("Failed to register {} - server closed", connection_id);
        return Err(AppError::ChannelSend);
    }

    let connected_msg = ServerMessage::Connected { sid: connection_id };
    let json = serde_json::to_string(&connected_msg)?;
    ws_sender.send(Message::Text(json.into())).await?;

    let cmd_tx_read = cmd_tx.clone();

    // Spawn read task (WebSocket -> ServerCommand)
    let mut read_task = tokio::spawn(async move {
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => match ClientMessage::decode(&text) {
                    Ok(client_msg) => {
                        let cmd = client_message_to_command(connection_id, client_msg);
                        if cmd_tx_read.send(cmd).await.is_err() {
                            debug!("Server closed, ending read task for {}", connection_id);
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Rejected frame from {}: {}", connection_id, e);
                        // Rejected at the door; the server never sees it
                        if let Some(reply) = ServerMessage::rejection(&e) {
                            if msg_tx.send(reply).await.is_err() {
                                break;
                            }
                        }
                    }
                },
                Ok(Message::Close(_)) => {
                    debug!("Connection {} sent close frame", connection_id);
                    break;
                }
                Ok(Message::Ping(_)) => {
                    // Pong is handled automatically by tungstenite
                    debug!("Ping from {}", connection_id);
                }
                Ok(Message::Pong(_)) => {
                    debug!("Pong from {}", connection_id);
                }
                Ok(_) => {
                    // Binary or other message types - ignore
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", connection_id, e);
                    break;
                }
            }
        }
        debug!("Read task ended for {}", connection_id);
    });

    // Spawn write task (ServerMessage -> WebSocket)
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, ending write task");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                    // Continue - don't break on serialization errors
                }
            }
        }
        debug!("Write task ended for {}", connection_id);

        // Send close frame when done
        let _ = ws_sender.close().await;
    });

    // Wait for either task to complete
    let read_finished = tokio::select! {
        _ = &mut read_task => {
            debug!("Read task completed for {}", connection_id);
            true
        }
        _ = &mut write_task => {
            debug!("Write task completed for {}", connection_id);
            false
        }
    };

    // No command from this connection may reach the server after Disconnect
    if !read_finished {
        read_task.abort();
        let _ = read_task.await;
    }

    // Session cleanup runs in the server
    let _ = cmd_tx
        .send(ServerCommand::Disconnect { connection_id })
        .await;

    info!("Connection {} closed", connection_id);

    Ok(())
}

/// Convert a ClientMessage to a ServerCommand
fn client_message_to_command(connection_id: ConnectionId, msg: ClientMessage) -> ServerCommand {
    match msg {
        ClientMessage::StartMeeting {
            meeting_code,
            user_id,
        } => ServerCommand::StartMeeting {
            connection_id,
            meeting_code,
            user_id,
        },
        ClientMessage::RequestJoin {
            meeting_code,
            user_info,
        } => ServerCommand::RequestJoin {
            connection_id,
            meeting_code,
            user_info,
        },
        ClientMessage::HostResponse {
            requester_sid,
            action,
            user_id,
        } => ServerCommand::HostResponse {
            connection_id,
            requester: requester_sid,
            user_id,
            action,
        },
        ClientMessage::KickParticipant { target_sid } => ServerCommand::KickParticipant {
            connection_id,
            target: target_sid,
        },
        ClientMessage::EndMeeting => ServerCommand::EndMeeting { connection_id },
        ClientMessage::WebrtcSignal {
            target_sid,
            payload,
        } => ServerCommand::WebrtcSignal {
            connection_id,
            target: target_sid,
            payload,
        },
    }
}
