use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::game::{GameSettings, PlayerMode};

/// Envelope of an action sent by a player (or synthesized by the timer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundAction {
    /// Player the action originates from.
    pub player_id: Uuid,
    /// Session the action targets.
    pub game_session_id: Uuid,
    /// What the player asks for.
    pub action: ActionKind,
}

impl InboundAction {
    /// Wrap `action` for dispatch on behalf of `player_id`.
    pub fn new(player_id: Uuid, game_session_id: Uuid, action: ActionKind) -> Self {
        Self {
            player_id,
            game_session_id,
            action,
        }
    }
}

/// Every action a player can send, each carrying only the fields it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    /// Ask for a fresh view of the session.
    RequestState,
    /// Change a player's role.
    SetPlayerMode {
        /// Player whose role changes.
        target_player_id: Uuid,
        /// New role.
        mode: PlayerMode,
    },
    /// Add a team to the lobby.
    CreateTeam {
        /// Display name, trimmed before validation.
        name: String,
    },
    /// Delete a team and unassign its members.
    RemoveTeam {
        /// Team to delete.
        team_id: Uuid,
    },
    /// Move a player onto a team, or off every team when `team_id` is absent.
    AssignTeam {
        /// Player being moved.
        target_player_id: Uuid,
        /// Destination team.
        #[serde(default)]
        team_id: Option<Uuid>,
    },
    /// Pick the packet the match will play.
    SetMatchPacket {
        /// Packet id from the catalog.
        packet_id: Uuid,
    },
    /// Replace the session settings.
    UpdateSettings {
        /// New settings.
        settings: GameSettings,
    },
    /// Leave the lobby and open round 0.
    StartMatch,
    /// Stop the match early.
    EndMatch,
    /// Proctor finished reading the tossup.
    FinishReading,
    /// Buzz in on the current tossup.
    Buzz,
    /// Proctor rules on the pending answer.
    ResolveTossup {
        /// Whether the answer was accepted.
        correct: bool,
    },
    /// Proctor closes the tossup without a correct answer.
    TossupTimeout,
    /// Archive the current round and open the next one.
    AdvanceRound,
    /// Proctor finished reading the bonus preamble.
    FinishBonusPreamble,
    /// Proctor finished reading the current bonus part.
    FinishBonusPart,
    /// Proctor rules on the current bonus part.
    ResolveBonusPart {
        /// Whether the answer was accepted.
        correct: bool,
    },
    /// Proctor closes the current bonus part unanswered.
    BonusTimeout,
    /// Any tag the server does not know.
    #[serde(other)]
    Unknown,
}

impl ActionKind {
    /// Wire tag of the action, used in logs and error payloads.
    pub fn type_name(&self) -> &'static str {
        match self {
            ActionKind::RequestState => "request_state",
            ActionKind::SetPlayerMode { .. } => "set_player_mode",
            ActionKind::CreateTeam { .. } => "create_team",
            ActionKind::RemoveTeam { .. } => "remove_team",
            ActionKind::AssignTeam { .. } => "assign_team",
            ActionKind::SetMatchPacket { .. } => "set_match_packet",
            ActionKind::UpdateSettings { .. } => "update_settings",
            ActionKind::StartMatch => "start_match",
            ActionKind::EndMatch => "end_match",
            ActionKind::FinishReading => "finish_reading",
            ActionKind::Buzz => "buzz",
            ActionKind::ResolveTossup { .. } => "resolve_tossup",
            ActionKind::TossupTimeout => "tossup_timeout",
            ActionKind::AdvanceRound => "advance_round",
            ActionKind::FinishBonusPreamble => "finish_bonus_preamble",
            ActionKind::FinishBonusPart => "finish_bonus_part",
            ActionKind::ResolveBonusPart { .. } => "resolve_bonus_part",
            ActionKind::BonusTimeout => "bonus_timeout",
            ActionKind::Unknown => "unknown",
        }
    }
}
