use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use uuid::Uuid;

use crate::{
    error::{ActionError, ErrorKind},
    state::game::{GameSession, Round, TeamScore},
};

/// Which countdown a [`ServerEvent::TimerUpdated`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Countdown for buzzing on the tossup.
    Tossup,
    /// Countdown for answering a bonus part.
    Bonus,
}

/// Events emitted to clients of a session.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Session setup changed (players, teams, packet, settings).
    SessionUpdated {
        /// Session as seen by the recipient.
        session: GameSession,
    },
    /// Answer to a `request_state` action.
    SessionState {
        /// Session as seen by the recipient.
        session: GameSession,
    },
    /// The match left the lobby.
    MatchStarted,
    /// The current round changed.
    RoundUpdated {
        /// Round as seen by the recipient.
        round: Round,
    },
    /// A buzz was accepted and an answer is pending.
    BuzzAccepted {
        /// Player who buzzed.
        player_id: Uuid,
        /// Team of that player.
        team_id: Uuid,
    },
    /// Tossup is over; its answer can be shown to everyone.
    TossupRevealed {
        /// Round the tossup belongs to.
        round_number: u32,
        /// Official answer.
        answer: String,
    },
    /// A countdown ticked.
    TimerUpdated {
        /// Countdown that ticked.
        timer: TimerKind,
        /// Whole seconds left.
        remaining_seconds: u32,
    },
    /// The match is over.
    MatchCompleted {
        /// Final score of every team.
        scoreboard: Vec<TeamScore>,
    },
    /// The sender's action was rejected.
    Error {
        /// Category of the failure.
        kind: ErrorKind,
        /// Human-readable detail.
        message: String,
        /// Tag of the rejected action, when known.
        action: Option<String>,
    },
}

impl ServerEvent {
    /// Error event for a rejected action.
    pub fn from_error(err: &ActionError, action: Option<&str>) -> Self {
        ServerEvent::Error {
            kind: err.kind(),
            message: err.to_string(),
            action: action.map(str::to_string),
        }
    }
}

/// An event plus its addressees. No recipients means every subscriber of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Players the event is for.
    #[serde(default)]
    pub recipients: Vec<Uuid>,
    /// The event itself.
    pub event: ServerEvent,
}

impl OutboundMessage {
    /// Event for everyone in the session.
    pub fn broadcast(event: ServerEvent) -> Self {
        Self {
            recipients: Vec::new(),
            event,
        }
    }

    /// Event for a single player.
    pub fn to(recipient: Uuid, event: ServerEvent) -> Self {
        Self {
            recipients: vec![recipient],
            event,
        }
    }

    /// Event for a set of players.
    pub fn to_many(recipients: Vec<Uuid>, event: ServerEvent) -> Self {
        Self { recipients, event }
    }

    /// Whether the message goes to the session topic.
    pub fn is_broadcast(&self) -> bool {
        self.recipients.is_empty()
    }
}

/// What a handler produced for one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// One message.
    Single(OutboundMessage),
    /// Individually addressed messages, published in order.
    Multi(Vec<OutboundMessage>),
}

impl Outcome {
    /// Flatten into publish order.
    pub fn into_messages(self) -> Vec<OutboundMessage> {
        match self {
            Outcome::Single(message) => vec![message],
            Outcome::Multi(messages) => messages,
        }
    }
}

impl From<OutboundMessage> for Outcome {
    fn from(message: OutboundMessage) -> Self {
        Outcome::Single(message)
    }
}
