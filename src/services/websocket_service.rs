//! Bridge between one player's WebSocket and the message bus.
//!
//! Inbound frames are parsed into actions and published on the action topic.
//! Events published for the player's session (broadcast and directed) are
//! forwarded as JSON text frames. No game logic lives here.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        action::{ActionKind, InboundAction},
        event::ServerEvent,
    },
    error::{ActionError, ServiceError},
    state::{
        SharedState,
        bus::{ACTION_TOPIC, BusMessage, recipient_topic, session_topic},
    },
};

#[derive(Debug, Error)]
enum BridgeError {
    /// Writer channel closed; the connection should be dropped.
    #[error("connection closed")]
    ConnectionClosed,
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Handle the full lifecycle of an authenticated player connection.
pub async fn handle_socket(
    state: SharedState,
    socket: WebSocket,
    session_id: Uuid,
    player_id: Uuid,
) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    // Subscribe before asking for state so the reply cannot be missed.
    let forward_task = spawn_event_forwarder(&state, session_id, player_id, outbound_tx.clone());
    info!(session = %session_id, player = %player_id, "player connected");

    let hello = InboundAction::new(player_id, session_id, ActionKind::RequestState);
    if let Err(err) = publish_action(&state, hello).await {
        warn!(player = %player_id, error = %err, "failed to request initial state");
    }

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(player = %player_id, payload = %text, "received player message");
                let result = match serde_json::from_str::<ActionKind>(&text) {
                    Ok(kind) => {
                        publish_action(&state, InboundAction::new(player_id, session_id, kind))
                            .await
                    }
                    Err(err) => {
                        let error = ActionError::ValidationFailure(format!("malformed action: {err}"));
                        send_event(&outbound_tx, &ServerEvent::from_error(&error, None))
                    }
                };
                match result {
                    Err(BridgeError::ConnectionClosed) => break,
                    Err(err) => warn!(player = %player_id, error = %err, "failed to handle player message"),
                    Ok(()) => {}
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(player = %player_id, error = %err, "websocket error");
                break;
            }
        }
    }

    forward_task.abort();
    info!(session = %session_id, player = %player_id, "player disconnected");
    finalize(writer_task, outbound_tx).await;
}

fn spawn_event_forwarder(
    state: &SharedState,
    session_id: Uuid,
    player_id: Uuid,
    outbound_tx: mpsc::UnboundedSender<Message>,
) -> JoinHandle<()> {
    let broadcast = BroadcastStream::new(state.bus().subscribe(&session_topic(session_id)));
    let direct =
        BroadcastStream::new(state.bus().subscribe(&recipient_topic(session_id, player_id)));
    let mut events = tokio_stream::StreamExt::merge(broadcast, direct);

    tokio::spawn(async move {
        while let Some(item) = events.next().await {
            match item {
                Ok(BusMessage::Event(message)) => {
                    if send_event(&outbound_tx, &message.event).is_err() {
                        break;
                    }
                }
                Ok(BusMessage::Action(_)) => {}
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(player = %player_id, skipped, "player connection lagged behind events");
                }
            }
        }
    })
}

async fn publish_action(state: &SharedState, action: InboundAction) -> Result<(), BridgeError> {
    state
        .bus()
        .publish(ACTION_TOPIC, BusMessage::Action(action))
        .await
        .map_err(|err| BridgeError::Service(ServiceError::Bus(err)))
}

/// Serialize an event and queue it on the writer channel.
fn send_event(
    tx: &mpsc::UnboundedSender<Message>,
    event: &ServerEvent,
) -> Result<(), BridgeError> {
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to serialize event `{event:?}`");
            return Ok(());
        }
    };
    tx.send(Message::Text(payload.into()))
        .map_err(|_| BridgeError::ConnectionClosed)
}

async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
