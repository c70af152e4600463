//! Topic-based publish/subscribe transport for actions and events.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use futures::future::{self, BoxFuture};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::trace;
use uuid::Uuid;

use crate::dto::{action::InboundAction, event::OutboundMessage};

/// Topic carrying player-originated actions to the dispatcher workers.
pub const ACTION_TOPIC: &str = "action";

/// Broadcast topic for every subscriber of a session.
pub fn session_topic(session_id: Uuid) -> String {
    format!("event/{session_id}")
}

/// Directed topic for a single player of a session.
pub fn recipient_topic(session_id: Uuid, recipient_id: Uuid) -> String {
    format!("event/{session_id}/{recipient_id}")
}

/// Payload travelling over the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum BusMessage {
    /// Player action headed for the dispatcher.
    Action(InboundAction),
    /// Server event headed for one or more players.
    Event(OutboundMessage),
}

/// Error raised by bus backends.
#[derive(Debug, Error)]
pub enum BusError {
    /// The transport cannot accept or hand out messages.
    #[error("message bus unavailable: {0}")]
    Unavailable(String),
}

/// Abstraction over the message transport.
///
/// Actions published on [`ACTION_TOPIC`] are queued without loss for the single
/// action consumer. Event topics fan out to every subscriber and may lag.
pub trait MessageBus: Send + Sync {
    /// Publish `message` on `topic`.
    fn publish(&self, topic: &str, message: BusMessage) -> BoxFuture<'static, Result<(), BusError>>;
    /// Subscribe to an event topic.
    fn subscribe(&self, topic: &str) -> broadcast::Receiver<BusMessage>;
    /// Take the receiving end of the action queue. Only one consumer may hold it.
    fn consume_actions(&self) -> Result<mpsc::UnboundedReceiver<InboundAction>, BusError>;
}

/// In-process bus: an unbounded queue for actions and one Tokio broadcast
/// channel per event topic.
#[derive(Clone)]
pub struct InMemoryBus {
    topics: Arc<DashMap<String, broadcast::Sender<BusMessage>>>,
    actions: mpsc::UnboundedSender<InboundAction>,
    action_queue: Arc<Mutex<Option<mpsc::UnboundedReceiver<InboundAction>>>>,
    capacity: usize,
}

impl InMemoryBus {
    /// Create a bus whose event topics buffer `capacity` messages per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (actions, action_queue) = mpsc::unbounded_channel();
        Self {
            topics: Arc::new(DashMap::new()),
            actions,
            action_queue: Arc::new(Mutex::new(Some(action_queue))),
            capacity: capacity.max(1),
        }
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<BusMessage> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Drop topics nobody listens to anymore.
    pub fn prune(&self) {
        self.topics.retain(|_, sender| sender.receiver_count() > 0);
    }
}

impl MessageBus for InMemoryBus {
    fn publish(&self, topic: &str, message: BusMessage) -> BoxFuture<'static, Result<(), BusError>> {
        let message = match (topic, message) {
            (ACTION_TOPIC, BusMessage::Action(action)) => {
                let result = self
                    .actions
                    .send(action)
                    .map_err(|_| BusError::Unavailable("action consumer stopped".into()));
                trace!(topic, queued = result.is_ok(), "published action");
                return Box::pin(future::ready(result));
            }
            (_, message) => message,
        };
        let delivered = self
            .topics
            .get(topic)
            .map(|sender| sender.send(message).unwrap_or(0))
            .unwrap_or(0);
        trace!(topic, delivered, "published bus message");
        Box::pin(future::ready(Ok(())))
    }

    fn subscribe(&self, topic: &str) -> broadcast::Receiver<BusMessage> {
        self.sender(topic).subscribe()
    }

    fn consume_actions(&self) -> Result<mpsc::UnboundedReceiver<InboundAction>, BusError> {
        self.action_queue
            .lock()
            .ok()
            .and_then(|mut queue| queue.take())
            .ok_or_else(|| BusError::Unavailable("action queue already has a consumer".into()))
    }
}
