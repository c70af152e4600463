//! In-game actions: reading, buzzing, rulings, timeouts and round advancement.

use uuid::Uuid;

use super::{require_match_state, require_proctor, round_messages};
use crate::{
    dto::event::{OutboundMessage, Outcome, ServerEvent},
    error::ActionError,
    state::{
        game::{GameSession, MatchState, PlayerMode, RoundState},
        state_machine::{self, AdvanceOutcome, RoundEvent},
    },
};

pub(super) fn finish_reading(session: &mut GameSession, actor: Uuid) -> Result<Outcome, ActionError> {
    proctor_event(session, actor, RoundEvent::FinishReading)
}

pub(super) fn buzz(session: &mut GameSession, actor: Uuid) -> Result<Outcome, ActionError> {
    require_match_state(session, MatchState::InGame)?;
    if session.player_mode(actor) != Some(PlayerMode::Buzzer) {
        return Err(ActionError::PermissionDenied(
            "only buzzers may buzz".into(),
        ));
    }
    let team_id = session
        .team_of_player(actor)
        .map(|team| team.id)
        .ok_or_else(|| ActionError::ValidationFailure("player is not on a team".into()))?;
    let already = session
        .current_round()
        .is_some_and(|round| round.team_has_buzzed(team_id));
    if already {
        return Err(ActionError::ValidationFailure(
            "team already buzzed on this tossup".into(),
        ));
    }

    state_machine::apply_round_event(
        session,
        RoundEvent::Buzz {
            player_id: actor,
            team_id,
        },
    )?;

    let mut messages = vec![OutboundMessage::broadcast(ServerEvent::BuzzAccepted {
        player_id: actor,
        team_id,
    })];
    messages.extend(round_messages(session));
    Ok(Outcome::Multi(messages))
}

pub(super) fn resolve_tossup(
    session: &mut GameSession,
    actor: Uuid,
    correct: bool,
) -> Result<Outcome, ActionError> {
    proctor_event(session, actor, RoundEvent::ResolveTossup { correct })
}

pub(super) fn tossup_timeout(session: &mut GameSession, actor: Uuid) -> Result<Outcome, ActionError> {
    proctor_event(session, actor, RoundEvent::TossupTimeout)
}

pub(super) fn finish_bonus_preamble(
    session: &mut GameSession,
    actor: Uuid,
) -> Result<Outcome, ActionError> {
    proctor_event(session, actor, RoundEvent::FinishBonusPreamble)
}

pub(super) fn finish_bonus_part(
    session: &mut GameSession,
    actor: Uuid,
) -> Result<Outcome, ActionError> {
    proctor_event(session, actor, RoundEvent::FinishBonusPart)
}

pub(super) fn resolve_bonus_part(
    session: &mut GameSession,
    actor: Uuid,
    correct: bool,
) -> Result<Outcome, ActionError> {
    proctor_event(session, actor, RoundEvent::ResolveBonusPart { correct })
}

pub(super) fn bonus_timeout(session: &mut GameSession, actor: Uuid) -> Result<Outcome, ActionError> {
    proctor_event(session, actor, RoundEvent::BonusTimeout)
}

pub(super) fn advance_round(session: &mut GameSession, actor: Uuid) -> Result<Outcome, ActionError> {
    require_proctor(session, actor)?;

    match state_machine::advance_round(session)? {
        AdvanceOutcome::NextRound(_) => Ok(Outcome::Multi(round_messages(session))),
        AdvanceOutcome::MatchCompleted => {
            Ok(OutboundMessage::broadcast(ServerEvent::MatchCompleted {
                scoreboard: session.scoreboard(),
            })
            .into())
        }
    }
}

/// Apply a proctor-only round event and describe the new round to everyone.
fn proctor_event(
    session: &mut GameSession,
    actor: Uuid,
    event: RoundEvent,
) -> Result<Outcome, ActionError> {
    require_proctor(session, actor)?;
    let tossup_event = matches!(
        event,
        RoundEvent::ResolveTossup { .. } | RoundEvent::TossupTimeout
    );
    let next = state_machine::apply_round_event(session, event)?;

    let mut messages = Vec::new();
    let tossup_over = matches!(
        next,
        RoundState::Completed | RoundState::BonusReadingPreamble
    );
    if tossup_event && tossup_over {
        if let Some(round) = session.current_round() {
            messages.push(OutboundMessage::broadcast(ServerEvent::TossupRevealed {
                round_number: round.number,
                answer: round.answer.clone(),
            }));
        }
    }
    messages.extend(round_messages(session));
    Ok(Outcome::Multi(messages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::{JoinRequest, Packet, Tossup, tests::settings};

    struct Table {
        session: GameSession,
        proctor: Uuid,
        alice: Uuid,
        bob: Uuid,
    }

    fn table() -> Table {
        let mut session = GameSession::new("PLAY01".into(), settings());
        let mut join = |name: &str| {
            session
                .add_player(JoinRequest {
                    display_name: name.into(),
                    user_id: None,
                })
                .id
        };
        let proctor = join("proctor");
        let alice = join("alice");
        let bob = join("bob");
        session.set_player_mode(proctor, PlayerMode::Proctor);
        session.set_player_mode(alice, PlayerMode::Buzzer);
        session.set_player_mode(bob, PlayerMode::Buzzer);
        let red = session.create_team("red".into());
        session.assign_team(alice, Some(red));
        session.assign_team(bob, Some(red));
        session.current_match.packet = Some(Packet {
            id: Uuid::new_v4(),
            name: "p".into(),
            tossups: (0..3)
                .map(|i| Tossup {
                    question: format!("q{i}"),
                    answer: format!("a{i}"),
                })
                .collect(),
            bonuses: vec![],
        });
        state_machine::start_match(&mut session).unwrap();
        Table {
            session,
            proctor,
            alice,
            bob,
        }
    }

    #[test]
    fn a_team_buzzes_once_per_tossup() {
        let mut t = table();

        buzz(&mut t.session, t.alice).unwrap();
        resolve_tossup(&mut t.session, t.proctor, false).unwrap();
        let err = buzz(&mut t.session, t.bob).unwrap_err();
        assert!(matches!(err, ActionError::ValidationFailure(_)));
    }

    #[test]
    fn only_buzzers_buzz_and_only_the_proctor_rules() {
        let mut t = table();

        let err = buzz(&mut t.session, t.proctor).unwrap_err();
        assert!(matches!(err, ActionError::PermissionDenied(_)));
        buzz(&mut t.session, t.alice).unwrap();
        let err = resolve_tossup(&mut t.session, t.alice, true).unwrap_err();
        assert!(matches!(err, ActionError::PermissionDenied(_)));
    }

    #[test]
    fn correct_ruling_reveals_the_answer() {
        let mut t = table();
        buzz(&mut t.session, t.alice).unwrap();

        let messages = resolve_tossup(&mut t.session, t.proctor, true)
            .unwrap()
            .into_messages();
        assert!(messages.contains(&OutboundMessage::broadcast(ServerEvent::TossupRevealed {
            round_number: 0,
            answer: "a0".into(),
        })));
    }

    #[test]
    fn timeout_in_wrong_state_is_rejected() {
        let mut t = table();
        let err = tossup_timeout(&mut t.session, t.proctor).unwrap_err();
        assert!(matches!(err, ActionError::WrongState(_)));
    }

    #[test]
    fn advancing_past_the_packet_completes_the_match() {
        let mut t = table();

        advance_round(&mut t.session, t.proctor).unwrap();
        advance_round(&mut t.session, t.proctor).unwrap();
        let messages = advance_round(&mut t.session, t.proctor)
            .unwrap()
            .into_messages();

        assert!(matches!(
            messages.as_slice(),
            [OutboundMessage {
                event: ServerEvent::MatchCompleted { .. },
                ..
            }]
        ));
        assert_eq!(t.session.current_match.state, MatchState::Completed);
    }
}
