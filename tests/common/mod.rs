#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use trivia_buzz_back::{
    config::AppConfig,
    dao::{
        packets::PacketCatalog,
        session_store::{InMemorySessionStore, SessionStore},
    },
    dto::{
        action::{ActionKind, InboundAction},
        event::{OutboundMessage, ServerEvent},
        game::{CreateGameRequest, JoinGameRequest},
    },
    error::ErrorKind,
    services::game_service,
    state::{
        AppState, SharedState,
        bus::InMemoryBus,
        game::{Bonus, BonusPart, GameMode, GameSession, Packet, PlayerMode, Tossup},
    },
};
use uuid::Uuid;

/// A session with an owner acting as proctor and one buzzer on team "red".
pub struct Harness {
    pub state: SharedState,
    pub store: InMemorySessionStore,
    pub bus: InMemoryBus,
    pub session_id: Uuid,
    pub owner: Uuid,
    pub alice: Uuid,
    pub red: Uuid,
    pub packet_id: Uuid,
}

pub fn packet(tossups: usize, bonuses: usize) -> Packet {
    Packet {
        id: Uuid::new_v4(),
        name: "regionals".into(),
        tossups: (0..tossups)
            .map(|i| Tossup {
                question: format!("question {i}"),
                answer: format!("answer {i}"),
            })
            .collect(),
        bonuses: (0..bonuses)
            .map(|i| Bonus {
                preamble: format!("preamble {i}"),
                parts: vec![BonusPart {
                    question: format!("part {i}"),
                    answer: format!("part answer {i}"),
                    value: 15,
                }],
            })
            .collect(),
    }
}

impl Harness {
    /// Owner and alice joined, nothing configured yet.
    pub async fn lobby(packet: Packet) -> Self {
        let store = InMemorySessionStore::new(Duration::from_secs(3600));
        let bus = InMemoryBus::new(64);
        let packet_id = packet.id;
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(store.clone()),
            Arc::new(bus.clone()),
            PacketCatalog::from_packets([packet]),
        );

        let created = game_service::create_game(
            &state,
            CreateGameRequest {
                display_name: "owner".into(),
                game_mode: GameMode::Quizbowl,
                user_id: None,
            },
        )
        .await
        .unwrap();
        let joined = game_service::join_game(
            &state,
            JoinGameRequest {
                join_code: created.join_code.to_lowercase(),
                display_name: "alice".into(),
                user_id: Some("user-alice".into()),
            },
        )
        .await
        .unwrap();

        Self {
            state,
            store,
            bus,
            session_id: created.game_session_id,
            owner: created.player_id,
            alice: joined.player_id,
            red: Uuid::nil(),
            packet_id,
        }
    }

    /// Lobby with the owner as proctor, alice buzzing for "red" and the packet selected.
    pub async fn configured(packet: Packet) -> Self {
        let mut harness = Self::lobby(packet).await;
        let owner = harness.owner;
        let alice = harness.alice;

        harness
            .act(
                owner,
                ActionKind::SetPlayerMode {
                    target_player_id: owner,
                    mode: PlayerMode::Proctor,
                },
            )
            .await;
        harness
            .act(owner, ActionKind::CreateTeam { name: "red".into() })
            .await;
        harness.red = harness.session().await.teams[0].id;
        harness
            .act(
                owner,
                ActionKind::AssignTeam {
                    target_player_id: alice,
                    team_id: Some(harness.red),
                },
            )
            .await;
        harness
            .act(
                alice,
                ActionKind::SetPlayerMode {
                    target_player_id: alice,
                    mode: PlayerMode::Buzzer,
                },
            )
            .await;
        harness
            .act(
                owner,
                ActionKind::SetMatchPacket {
                    packet_id: harness.packet_id,
                },
            )
            .await;
        harness
    }

    pub async fn act(&self, player: Uuid, action: ActionKind) -> Vec<OutboundMessage> {
        self.state
            .dispatcher()
            .dispatch(InboundAction::new(player, self.session_id, action))
            .await
            .unwrap()
    }

    pub async fn session(&self) -> GameSession {
        self.store.get(self.session_id).await.unwrap().unwrap()
    }
}

/// Kind of the single error message in `messages`, if that is what they are.
pub fn error_kind(messages: &[OutboundMessage]) -> Option<ErrorKind> {
    match messages {
        [
            OutboundMessage {
                event: ServerEvent::Error { kind, .. },
                ..
            },
        ] => Some(*kind),
        _ => None,
    }
}
