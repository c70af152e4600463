//! One handler per action type. Handlers run their permission and state
//! guards before mutating, so an `Err` always means the session is unchanged.

mod lobby;
mod round;

use crate::{
    dao::packets::PacketSource,
    dto::{
        action::{ActionKind, InboundAction},
        event::{OutboundMessage, Outcome, ServerEvent},
    },
    error::ActionError,
    services::sanitizer::{sanitize_round, sanitize_session},
    state::game::{GameSession, MatchState, PlayerMode},
};

/// Route `action` to its handler.
pub async fn handle(
    packets: &dyn PacketSource,
    action: &InboundAction,
    session: &mut GameSession,
) -> Result<Outcome, ActionError> {
    let actor = action.player_id;
    if session.player(actor).is_none() {
        return Err(ActionError::EntityNotFound(format!("player `{actor}`")));
    }

    match &action.action {
        ActionKind::RequestState => lobby::request_state(session, actor),
        ActionKind::SetPlayerMode {
            target_player_id,
            mode,
        } => lobby::set_player_mode(session, actor, *target_player_id, *mode),
        ActionKind::CreateTeam { name } => lobby::create_team(session, actor, name),
        ActionKind::RemoveTeam { team_id } => lobby::remove_team(session, actor, *team_id),
        ActionKind::AssignTeam {
            target_player_id,
            team_id,
        } => lobby::assign_team(session, actor, *target_player_id, *team_id),
        ActionKind::SetMatchPacket { packet_id } => {
            lobby::set_match_packet(session, actor, packets, *packet_id).await
        }
        ActionKind::UpdateSettings { settings } => {
            lobby::update_settings(session, actor, settings.clone())
        }
        ActionKind::StartMatch => lobby::start_match(session, actor),
        ActionKind::EndMatch => lobby::end_match(session, actor),
        ActionKind::FinishReading => round::finish_reading(session, actor),
        ActionKind::Buzz => round::buzz(session, actor),
        ActionKind::ResolveTossup { correct } => round::resolve_tossup(session, actor, *correct),
        ActionKind::TossupTimeout => round::tossup_timeout(session, actor),
        ActionKind::AdvanceRound => round::advance_round(session, actor),
        ActionKind::FinishBonusPreamble => round::finish_bonus_preamble(session, actor),
        ActionKind::FinishBonusPart => round::finish_bonus_part(session, actor),
        ActionKind::ResolveBonusPart { correct } => {
            round::resolve_bonus_part(session, actor, *correct)
        }
        ActionKind::BonusTimeout => round::bonus_timeout(session, actor),
        ActionKind::Unknown => Err(ActionError::UnknownActionType),
    }
}

/// Session view for everyone: full copy to the proctor, redacted copy to the rest.
pub fn session_messages(
    session: &GameSession,
    build: impl Fn(GameSession) -> ServerEvent,
) -> Vec<OutboundMessage> {
    role_scoped(session, |viewer| build(sanitize_session(session, viewer)))
}

/// Current round for everyone, role-filtered like [`session_messages`].
pub fn round_messages(session: &GameSession) -> Vec<OutboundMessage> {
    let Some(round) = session.current_round() else {
        return Vec::new();
    };
    role_scoped(session, |viewer| ServerEvent::RoundUpdated {
        round: sanitize_round(round, viewer),
    })
}

fn role_scoped(
    session: &GameSession,
    build: impl Fn(PlayerMode) -> ServerEvent,
) -> Vec<OutboundMessage> {
    match session.proctor() {
        Some(proctor) => {
            let mut messages = vec![OutboundMessage::to(
                proctor.id,
                build(PlayerMode::Proctor),
            )];
            let others = session.players_except(proctor.id);
            if !others.is_empty() {
                messages.push(OutboundMessage::to_many(
                    others,
                    build(PlayerMode::Spectator),
                ));
            }
            messages
        }
        None => vec![OutboundMessage::broadcast(build(PlayerMode::Spectator))],
    }
}

fn require_owner(session: &GameSession, actor: uuid::Uuid) -> Result<(), ActionError> {
    if session.is_owner(actor) {
        Ok(())
    } else {
        Err(ActionError::PermissionDenied(
            "only the game owner may do this".into(),
        ))
    }
}

fn require_proctor(session: &GameSession, actor: uuid::Uuid) -> Result<(), ActionError> {
    if session.player_mode(actor) == Some(PlayerMode::Proctor) {
        Ok(())
    } else {
        Err(ActionError::PermissionDenied(
            "only the proctor may do this".into(),
        ))
    }
}

fn require_match_state(session: &GameSession, expected: MatchState) -> Result<(), ActionError> {
    let actual = session.current_match.state;
    if actual == expected {
        Ok(())
    } else {
        Err(ActionError::WrongState(format!(
            "match is {actual:?}, action requires {expected:?}"
        )))
    }
}
