//! Session setup actions, plus start/end of the match.

use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use super::{require_match_state, require_owner, round_messages, session_messages};
use crate::{
    dao::packets::PacketSource,
    dto::event::{OutboundMessage, Outcome, ServerEvent},
    error::ActionError,
    services::sanitizer::sanitize_session,
    state::{
        game::{GameSession, GameSettings, MatchState, PlayerMode},
        state_machine,
    },
};

#[derive(Debug, Validate)]
struct TeamName {
    #[validate(length(min = 1, max = 32, message = "team name must be 1 to 32 characters"))]
    name: String,
}

pub(super) fn request_state(session: &GameSession, actor: Uuid) -> Result<Outcome, ActionError> {
    let viewer = session
        .player_mode(actor)
        .ok_or_else(|| ActionError::EntityNotFound(format!("player `{actor}`")))?;
    Ok(OutboundMessage::to(
        actor,
        ServerEvent::SessionState {
            session: sanitize_session(session, viewer),
        },
    )
    .into())
}

pub(super) fn set_player_mode(
    session: &mut GameSession,
    actor: Uuid,
    target: Uuid,
    mode: PlayerMode,
) -> Result<Outcome, ActionError> {
    let current = session
        .player_mode(target)
        .ok_or_else(|| ActionError::EntityNotFound(format!("player `{target}`")))?;

    let self_service = actor == target && mode != PlayerMode::Proctor;
    if !self_service {
        require_owner(session, actor)?;
    }
    if mode == PlayerMode::Proctor || current == PlayerMode::Proctor {
        require_match_state(session, MatchState::Config)?;
    }

    session.set_player_mode(target, mode);
    Ok(updated(session))
}

pub(super) fn create_team(
    session: &mut GameSession,
    actor: Uuid,
    name: &str,
) -> Result<Outcome, ActionError> {
    require_owner(session, actor)?;
    require_match_state(session, MatchState::Config)?;
    let team = TeamName {
        name: name.trim().to_string(),
    };
    team.validate()?;

    session.create_team(team.name);
    Ok(updated(session))
}

pub(super) fn remove_team(
    session: &mut GameSession,
    actor: Uuid,
    team_id: Uuid,
) -> Result<Outcome, ActionError> {
    require_owner(session, actor)?;
    require_match_state(session, MatchState::Config)?;

    session
        .remove_team(team_id)
        .ok_or_else(|| ActionError::EntityNotFound(format!("team `{team_id}`")))?;
    Ok(updated(session))
}

pub(super) fn assign_team(
    session: &mut GameSession,
    actor: Uuid,
    target: Uuid,
    team_id: Option<Uuid>,
) -> Result<Outcome, ActionError> {
    if actor != target {
        require_owner(session, actor)?;
    }
    require_match_state(session, MatchState::Config)?;

    let mode = session
        .player_mode(target)
        .ok_or_else(|| ActionError::EntityNotFound(format!("player `{target}`")))?;
    if let Some(team_id) = team_id {
        if session.team(team_id).is_none() {
            return Err(ActionError::EntityNotFound(format!("team `{team_id}`")));
        }
        if mode == PlayerMode::Proctor {
            return Err(ActionError::ValidationFailure(
                "the proctor cannot join a team".into(),
            ));
        }
    }

    session.assign_team(target, team_id);
    Ok(updated(session))
}

pub(super) async fn set_match_packet(
    session: &mut GameSession,
    actor: Uuid,
    packets: &dyn PacketSource,
    packet_id: Uuid,
) -> Result<Outcome, ActionError> {
    require_owner(session, actor)?;
    require_match_state(session, MatchState::Config)?;

    let packet = packets
        .get_packet_by_id(packet_id)
        .await
        .unwrap_or_else(|err| {
            warn!(packet = %packet_id, error = %err, "packet lookup failed");
            None
        })
        .ok_or_else(|| ActionError::EntityNotFound(format!("packet `{packet_id}`")))?;

    session.current_match.packet = Some(packet);
    Ok(updated(session))
}

pub(super) fn update_settings(
    session: &mut GameSession,
    actor: Uuid,
    settings: GameSettings,
) -> Result<Outcome, ActionError> {
    require_owner(session, actor)?;
    require_match_state(session, MatchState::Config)?;

    session.settings = settings;
    Ok(updated(session))
}

pub(super) fn start_match(session: &mut GameSession, actor: Uuid) -> Result<Outcome, ActionError> {
    require_owner(session, actor)?;
    state_machine::start_match(session)?;

    let mut messages = vec![OutboundMessage::broadcast(ServerEvent::MatchStarted)];
    messages.extend(round_messages(session));
    Ok(Outcome::Multi(messages))
}

pub(super) fn end_match(session: &mut GameSession, actor: Uuid) -> Result<Outcome, ActionError> {
    require_owner(session, actor)?;
    state_machine::end_match(session)?;

    Ok(OutboundMessage::broadcast(ServerEvent::MatchCompleted {
        scoreboard: session.scoreboard(),
    })
    .into())
}

fn updated(session: &GameSession) -> Outcome {
    Outcome::Multi(session_messages(session, |session| {
        ServerEvent::SessionUpdated { session }
    }))
}
