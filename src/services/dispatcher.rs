//! Serialized processing of player actions against a session.
//!
//! Every action runs under its session's lock: fetch, handle, persist, publish.
//! Handler errors never escape; they become an error event for the originator
//! and leave the stored session untouched.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::{packets::PacketSource, session_store::SessionStore},
    dto::{
        action::InboundAction,
        event::{OutboundMessage, Outcome, ServerEvent},
    },
    error::{ActionError, DispatchError},
    services::{handlers, timer::TimerRegistry},
    state::{
        SessionLocks,
        bus::{BusMessage, MessageBus, recipient_topic, session_topic},
        game::GameSession,
    },
};

/// Routes actions to handlers and publishes what they produce.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn SessionStore>,
    bus: Arc<dyn MessageBus>,
    packets: Arc<dyn PacketSource>,
    locks: SessionLocks,
    timers: TimerRegistry,
}

impl Dispatcher {
    /// Build a dispatcher over the given backends.
    pub fn new(
        store: Arc<dyn SessionStore>,
        bus: Arc<dyn MessageBus>,
        packets: Arc<dyn PacketSource>,
        locks: SessionLocks,
        timers: TimerRegistry,
    ) -> Self {
        Self {
            store,
            bus,
            packets,
            locks,
            timers,
        }
    }

    /// Per-session locks shared with the timer and join paths.
    pub fn locks(&self) -> &SessionLocks {
        &self.locks
    }

    /// Sessions with a running countdown.
    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    /// Session store the dispatcher persists to.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Process one action and return the messages that were published for it.
    ///
    /// Only infrastructure failures are reported as `Err`; a rejected action
    /// yields a single error message addressed to its sender.
    pub async fn dispatch(
        &self,
        action: InboundAction,
    ) -> Result<Vec<OutboundMessage>, DispatchError> {
        let session_id = action.game_session_id;
        let _guard = self.locks.acquire(session_id).await;
        debug!(
            session = %session_id,
            player = %action.player_id,
            action = action.action.type_name(),
            "dispatching action"
        );

        let Some(mut session) = self.store.get(session_id).await? else {
            let err = ActionError::EntityNotFound(format!("session `{session_id}`"));
            return self.reject(&action, err).await;
        };

        match self.run_handler(&action, &mut session).await {
            Ok(outcome) => self.commit(&session, outcome.into_messages()).await,
            Err(err) => self.reject(&action, err).await,
        }
    }

    /// Run the handler for `action` against `session` without persisting.
    ///
    /// Callers must hold the session's lock.
    pub(crate) async fn run_handler(
        &self,
        action: &InboundAction,
        session: &mut GameSession,
    ) -> Result<Outcome, ActionError> {
        handlers::handle(self.packets.as_ref(), action, session).await
    }

    /// Persist `session`, refresh its timer registration, then publish `messages`.
    ///
    /// Callers must hold the session's lock.
    pub(crate) async fn commit(
        &self,
        session: &GameSession,
        messages: Vec<OutboundMessage>,
    ) -> Result<Vec<OutboundMessage>, DispatchError> {
        self.store.save(session.clone()).await?;
        self.timers.refresh(session);
        self.publish(session.id, &messages).await?;
        Ok(messages)
    }

    async fn reject(
        &self,
        action: &InboundAction,
        err: ActionError,
    ) -> Result<Vec<OutboundMessage>, DispatchError> {
        info!(
            session = %action.game_session_id,
            player = %action.player_id,
            action = action.action.type_name(),
            error = %err,
            "rejected action"
        );
        let message = OutboundMessage::to(
            action.player_id,
            ServerEvent::from_error(&err, Some(action.action.type_name())),
        );
        let messages = vec![message];
        self.publish(action.game_session_id, &messages).await?;
        Ok(messages)
    }

    async fn publish(
        &self,
        session_id: Uuid,
        messages: &[OutboundMessage],
    ) -> Result<(), DispatchError> {
        for message in messages {
            if message.is_broadcast() {
                self.bus
                    .publish(
                        &session_topic(session_id),
                        BusMessage::Event(message.clone()),
                    )
                    .await?;
                continue;
            }
            for recipient in &message.recipients {
                self.bus
                    .publish(
                        &recipient_topic(session_id, *recipient),
                        BusMessage::Event(message.clone()),
                    )
                    .await?;
            }
        }
        Ok(())
    }
}
