use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::format_system_time,
    state::game::{GameMode, GameSession, Packet, Player},
};

/// Payload used to open a new session; the caller joins as its owner.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    /// Name shown to the other players.
    #[validate(length(min = 1, max = 32))]
    pub display_name: String,
    /// Rule set selecting the session's default settings.
    pub game_mode: GameMode,
    /// Identity resolved by the authentication layer; omitted for guests.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Payload used to join an existing session by its code.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinGameRequest {
    /// Case-insensitive join code.
    #[validate(length(equal = 6))]
    pub join_code: String,
    /// Name shown to the other players.
    #[validate(length(min = 1, max = 32))]
    pub display_name: String,
    /// Identity resolved by the authentication layer; omitted for guests.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Credentials handed back after creating or joining a session.
///
/// `secret` must be presented when opening the WebSocket.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JoinedGame {
    /// Session joined.
    pub game_session_id: Uuid,
    /// Code to share with other players.
    pub join_code: String,
    /// Id assigned to the caller.
    pub player_id: Uuid,
    /// Capability token for the caller.
    pub secret: String,
    /// Whether the caller owns the session.
    pub is_owner: bool,
    /// Session creation time (RFC 3339).
    pub created_at: String,
}

impl JoinedGame {
    /// Credentials of `player` in `session`.
    pub fn new(session: &GameSession, player: &Player) -> Self {
        Self {
            game_session_id: session.id,
            join_code: session.join_code.clone(),
            player_id: player.id,
            secret: player.secret.clone(),
            is_owner: player.is_owner,
            created_at: format_system_time(session.created_at),
        }
    }
}

/// Catalog entry an owner can select for the match.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PacketSummary {
    /// Packet identifier.
    pub id: Uuid,
    /// Human readable packet name.
    pub name: String,
    /// Number of tossups, hence of rounds.
    pub tossup_count: usize,
    /// Number of bonuses.
    pub bonus_count: usize,
}

impl From<&Packet> for PacketSummary {
    fn from(packet: &Packet) -> Self {
        Self {
            id: packet.id,
            name: packet.name.clone(),
            tossup_count: packet.tossups.len(),
            bonus_count: packet.bonuses.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_request_requires_a_six_character_code() {
        let request = JoinGameRequest {
            join_code: "ABC".into(),
            display_name: "alice".into(),
            user_id: None,
        };
        assert!(request.validate().is_err());

        let request = JoinGameRequest {
            join_code: "abc234".into(),
            ..request
        };
        assert!(request.validate().is_ok());
    }
}
