//! Match and round lifecycle, including the buzz/answer protocol.
//!
//! Round transitions are computed from `(state, event)` pairs first and only
//! applied once the pair is known to be valid, so a rejected event leaves the
//! session untouched.

use thiserror::Error;
use uuid::Uuid;

use crate::state::game::{
    BonusProgress, Buzz, GameSession, MatchState, Round, RoundState,
};

/// Events that can be applied to the current round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundEvent {
    /// Proctor finished reading the tossup aloud.
    FinishReading,
    /// A buzzer claims the right to answer for its team.
    Buzz {
        /// Player who buzzed.
        player_id: Uuid,
        /// Team the player answers for.
        team_id: Uuid,
    },
    /// Proctor rules on the active buzz.
    ResolveTossup {
        /// Whether the answer was accepted.
        correct: bool,
    },
    /// Nobody buzzed in time.
    TossupTimeout,
    /// Proctor finished reading the bonus preamble.
    FinishBonusPreamble,
    /// Proctor finished reading the current bonus part.
    FinishBonusPart,
    /// Proctor rules on the current bonus part.
    ResolveBonusPart {
        /// Whether the answer was accepted.
        correct: bool,
    },
    /// The bonus team ran out of time on the current part.
    BonusTimeout,
}

/// Error returned when attempting to apply an invalid round transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The state the round was in when the event was received.
    pub from: RoundState,
    /// The event that cannot be applied from this state.
    pub event: RoundEvent,
}

/// Errors raised by match-level operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// Operation requires another match state.
    #[error("match is {actual:?}, expected {expected:?}")]
    WrongMatchState {
        /// Required state.
        expected: MatchState,
        /// Current state.
        actual: MatchState,
    },
    /// The match has no round in progress.
    #[error("no round in progress")]
    NoCurrentRound,
    /// Round event not valid from the current round state.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// No packet has been selected.
    #[error("no packet selected for the match")]
    MissingPacket,
    /// The selected packet holds no tossup.
    #[error("selected packet has no tossups")]
    EmptyPacket,
    /// No player is the proctor.
    #[error("no proctor assigned")]
    MissingProctor,
    /// A team has no members.
    #[error("team `{team_id}` has no players")]
    EmptyTeam {
        /// Team without members.
        team_id: Uuid,
    },
}

/// Result of [`advance_round`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// A new round with the given number is now current.
    NextRound(u32),
    /// The packet is exhausted and the match completed.
    MatchCompleted,
}

/// Move the match from config to in-game and install round 0.
///
/// Requires a packet with at least one tossup, a proctor, and a member in
/// every team.
pub fn start_match(session: &mut GameSession) -> Result<(), MatchError> {
    ensure_match_state(session, MatchState::Config)?;

    let packet = session
        .current_match
        .packet
        .as_ref()
        .ok_or(MatchError::MissingPacket)?;
    let first = packet.tossups.first().ok_or(MatchError::EmptyPacket)?;
    if session.proctor().is_none() {
        return Err(MatchError::MissingProctor);
    }
    if let Some(team) = session.teams.iter().find(|team| team.player_ids.is_empty()) {
        return Err(MatchError::EmptyTeam { team_id: team.id });
    }

    let round = Round::new(0, first);
    for team in &mut session.teams {
        team.score = 0;
    }
    session.current_match.rounds.clear();
    session.current_match.current_round = Some(round);
    session.current_match.state = MatchState::InGame;
    Ok(())
}

/// Replace the current round with the next tossup, or complete the match
/// once the packet has no tossup for the next round number.
///
/// Round 0 is the setup round and is never archived.
pub fn advance_round(session: &mut GameSession) -> Result<AdvanceOutcome, MatchError> {
    ensure_match_state(session, MatchState::InGame)?;

    let current_number = session
        .current_round()
        .map(|round| round.number)
        .ok_or(MatchError::NoCurrentRound)?;
    let next_number = current_number + 1;
    let next_tossup = session
        .current_match
        .packet
        .as_ref()
        .ok_or(MatchError::MissingPacket)?
        .tossups
        .get(next_number as usize)
        .cloned();

    archive_current_round(session);

    match next_tossup {
        Some(tossup) => {
            session.current_match.current_round = Some(Round::new(next_number, &tossup));
            Ok(AdvanceOutcome::NextRound(next_number))
        }
        None => {
            session.current_match.state = MatchState::Completed;
            Ok(AdvanceOutcome::MatchCompleted)
        }
    }
}

/// Stop an in-game match early.
pub fn end_match(session: &mut GameSession) -> Result<(), MatchError> {
    ensure_match_state(session, MatchState::InGame)?;
    archive_current_round(session);
    session.current_match.state = MatchState::Completed;
    Ok(())
}

/// Apply `event` to the current round and return the round's new state.
pub fn apply_round_event(
    session: &mut GameSession,
    event: RoundEvent,
) -> Result<RoundState, MatchError> {
    ensure_match_state(session, MatchState::InGame)?;

    let settings = session.settings.clone();
    let round_number = session
        .current_round()
        .map(|round| round.number)
        .ok_or(MatchError::NoCurrentRound)?;
    let bonus = session
        .current_match
        .packet
        .as_ref()
        .and_then(|packet| packet.bonuses.get(round_number as usize))
        .filter(|bonus| settings.bonuses_enabled && !bonus.parts.is_empty())
        .cloned();

    let round = session
        .current_match
        .current_round
        .as_mut()
        .ok_or(MatchError::NoCurrentRound)?;
    let next = compute_transition(round, &event, bonus.is_some())?;

    let mut award = None;
    match event {
        RoundEvent::FinishReading => {
            // The countdown starts once per round; later reads never re-arm it.
            if !round.proctor_finished_reading {
                round.proctor_finished_reading = true;
                round.tossup_timer.start(settings.tossup_timer_seconds);
            }
        }
        RoundEvent::Buzz { player_id, team_id } => {
            round.archive_current_buzz();
            round.current_buzz = Some(Buzz {
                player_id,
                team_id,
                correct: None,
            });
        }
        RoundEvent::ResolveTossup { correct } => {
            if let Some(mut buzz) = round.current_buzz.take() {
                buzz.correct = Some(correct);
                if correct {
                    award = Some((buzz.team_id, settings.tossup_points));
                    round.tossup_timer.clear();
                    if let Some(bonus) = bonus.as_ref() {
                        round.bonus = Some(BonusProgress::new(buzz.team_id, bonus));
                    }
                }
                round.buzz_list.push(buzz);
            }
        }
        RoundEvent::TossupTimeout => round.tossup_timer.clear(),
        RoundEvent::FinishBonusPreamble => {}
        RoundEvent::FinishBonusPart => {
            if let Some(progress) = round.bonus.as_mut() {
                progress.timer.start(settings.bonus_timer_seconds);
            }
        }
        RoundEvent::ResolveBonusPart { correct } => {
            award = resolve_bonus_part(round, correct);
        }
        RoundEvent::BonusTimeout => {
            award = resolve_bonus_part(round, false);
        }
    }
    round.state = next;

    if let Some((team_id, points)) = award {
        if let Some(team) = session.team_mut(team_id) {
            team.score += points;
        }
    }
    Ok(next)
}

/// Compute the next round state for `event`, without mutating anything.
fn compute_transition(
    round: &Round,
    event: &RoundEvent,
    bonus_available: bool,
) -> Result<RoundState, InvalidTransition> {
    let next = match (round.state, event) {
        (RoundState::ProctorReading, RoundEvent::FinishReading) => RoundState::AwaitingBuzz,
        (RoundState::AwaitingAnswer, RoundEvent::FinishReading) => RoundState::AwaitingAnswer,
        (RoundState::ProctorReading | RoundState::AwaitingBuzz, RoundEvent::Buzz { .. }) => {
            RoundState::AwaitingAnswer
        }
        (RoundState::AwaitingAnswer, RoundEvent::ResolveTossup { correct: false }) => {
            if round.proctor_finished_reading {
                RoundState::AwaitingBuzz
            } else {
                RoundState::ProctorReading
            }
        }
        (RoundState::AwaitingAnswer, RoundEvent::ResolveTossup { correct: true }) => {
            if bonus_available {
                RoundState::BonusReadingPreamble
            } else {
                RoundState::Completed
            }
        }
        (RoundState::AwaitingBuzz, RoundEvent::TossupTimeout) => RoundState::Completed,
        (RoundState::BonusReadingPreamble, RoundEvent::FinishBonusPreamble) => {
            RoundState::BonusReadingPart
        }
        (RoundState::BonusReadingPart, RoundEvent::FinishBonusPart) => {
            RoundState::BonusAwaitingAnswer
        }
        (
            RoundState::BonusAwaitingAnswer,
            RoundEvent::ResolveBonusPart { .. } | RoundEvent::BonusTimeout,
        ) => {
            let remaining = round
                .bonus
                .as_ref()
                .is_some_and(|progress| progress.part_index + 1 < progress.parts.len());
            if remaining {
                RoundState::BonusReadingPart
            } else {
                RoundState::BonusCompleted
            }
        }
        (from, event) => {
            return Err(InvalidTransition {
                from,
                event: event.clone(),
            });
        }
    };

    Ok(next)
}

/// Record the ruling on the current bonus part and return the points earned.
fn resolve_bonus_part(round: &mut Round, correct: bool) -> Option<(Uuid, i32)> {
    let progress = round.bonus.as_mut()?;
    let value = progress.current_part().map(|part| part.value)?;
    progress.results.push(correct);
    progress.timer.clear();
    progress.part_index += 1;
    correct.then_some((progress.team_id, value))
}

/// Take the current round off the match, archiving it unless it is round 0.
fn archive_current_round(session: &mut GameSession) {
    let Some(mut round) = session.current_match.current_round.take() else {
        return;
    };
    round.archive_current_buzz();
    round.tossup_timer.clear();
    if let Some(progress) = round.bonus.as_mut() {
        progress.timer.clear();
    }
    if round.number != 0 {
        session.current_match.rounds.push(round);
    }
}

fn ensure_match_state(session: &GameSession, expected: MatchState) -> Result<(), MatchError> {
    let actual = session.current_match.state;
    if actual != expected {
        return Err(MatchError::WrongMatchState { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::{
        Bonus, BonusPart, GameSettings, JoinRequest, Packet, PlayerMode, Tossup,
        tests::settings,
    };

    struct Fixture {
        session: GameSession,
        red: Uuid,
        blue: Uuid,
        alice: Uuid,
        bob: Uuid,
    }

    fn packet(tossups: usize, bonuses: usize) -> Packet {
        Packet {
            id: Uuid::new_v4(),
            name: "packet".into(),
            tossups: (0..tossups)
                .map(|i| Tossup {
                    question: format!("question {i}"),
                    answer: format!("answer {i}"),
                })
                .collect(),
            bonuses: (0..bonuses)
                .map(|i| Bonus {
                    preamble: format!("preamble {i}"),
                    parts: vec![
                        BonusPart {
                            question: "part a".into(),
                            answer: "a".into(),
                            value: 10,
                        },
                        BonusPart {
                            question: "part b".into(),
                            answer: "b".into(),
                            value: 10,
                        },
                    ],
                })
                .collect(),
        }
    }

    fn fixture(tossups: usize, bonuses: usize, settings: GameSettings) -> Fixture {
        let mut session = GameSession::new("ROUND1".into(), settings);
        let mut join = |name: &str| {
            session
                .add_player(JoinRequest {
                    display_name: name.into(),
                    user_id: None,
                })
                .id
        };
        let owner = join("owner");
        let alice = join("alice");
        let bob = join("bob");
        session.set_player_mode(owner, PlayerMode::Proctor);
        session.set_player_mode(alice, PlayerMode::Buzzer);
        session.set_player_mode(bob, PlayerMode::Buzzer);
        let red = session.create_team("red".into());
        let blue = session.create_team("blue".into());
        session.assign_team(alice, Some(red));
        session.assign_team(bob, Some(blue));
        session.current_match.packet = Some(packet(tossups, bonuses));
        Fixture {
            session,
            red,
            blue,
            alice,
            bob,
        }
    }

    fn round(session: &GameSession) -> &Round {
        session.current_round().unwrap()
    }

    #[test]
    fn start_requires_complete_setup() {
        let mut f = fixture(1, 0, settings());
        f.session.current_match.packet = None;
        assert_eq!(start_match(&mut f.session), Err(MatchError::MissingPacket));

        let mut f = fixture(1, 0, settings());
        let empty = f.session.create_team("green".into());
        assert_eq!(
            start_match(&mut f.session),
            Err(MatchError::EmptyTeam { team_id: empty })
        );

        let mut f = fixture(0, 0, settings());
        assert_eq!(start_match(&mut f.session), Err(MatchError::EmptyPacket));
    }

    #[test]
    fn start_installs_round_zero() {
        let mut f = fixture(2, 0, settings());
        start_match(&mut f.session).unwrap();

        assert_eq!(f.session.current_match.state, MatchState::InGame);
        assert_eq!(round(&f.session).number, 0);
        assert_eq!(round(&f.session).state, RoundState::ProctorReading);
        assert_eq!(round(&f.session).question, "question 0");
        assert!(matches!(
            start_match(&mut f.session),
            Err(MatchError::WrongMatchState { .. })
        ));
    }

    #[test]
    fn single_tossup_packet_completes_without_archiving_round_zero() {
        let mut f = fixture(1, 0, settings());
        start_match(&mut f.session).unwrap();

        assert_eq!(
            advance_round(&mut f.session),
            Ok(AdvanceOutcome::MatchCompleted)
        );
        assert_eq!(f.session.current_match.state, MatchState::Completed);
        assert!(f.session.current_match.current_round.is_none());
        assert!(f.session.current_match.rounds.is_empty());
    }

    #[test]
    fn repeated_advances_archive_rounds_in_order() {
        let mut f = fixture(4, 0, settings());
        start_match(&mut f.session).unwrap();

        let mut seen = Vec::new();
        while let Ok(AdvanceOutcome::NextRound(number)) = advance_round(&mut f.session) {
            seen.push(number);
            let archived: Vec<u32> = f
                .session
                .current_match
                .rounds
                .iter()
                .map(|round| round.number)
                .collect();
            let expected: Vec<u32> = (1..number).collect();
            assert_eq!(archived, expected);
        }

        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(f.session.current_match.state, MatchState::Completed);
        let archived: Vec<u32> = f
            .session
            .current_match
            .rounds
            .iter()
            .map(|round| round.number)
            .collect();
        assert_eq!(archived, vec![1, 2, 3]);
    }

    #[test]
    fn buzz_moves_to_awaiting_answer_from_reading_or_waiting() {
        let mut f = fixture(2, 0, settings());
        start_match(&mut f.session).unwrap();

        let next = apply_round_event(
            &mut f.session,
            RoundEvent::Buzz {
                player_id: f.alice,
                team_id: f.red,
            },
        );
        assert_eq!(next, Ok(RoundState::AwaitingAnswer));
        assert!(round(&f.session).buzz_list.is_empty());

        apply_round_event(&mut f.session, RoundEvent::ResolveTossup { correct: false }).unwrap();
        apply_round_event(&mut f.session, RoundEvent::FinishReading).unwrap();
        assert_eq!(round(&f.session).state, RoundState::AwaitingBuzz);

        let next = apply_round_event(
            &mut f.session,
            RoundEvent::Buzz {
                player_id: f.bob,
                team_id: f.blue,
            },
        );
        assert_eq!(next, Ok(RoundState::AwaitingAnswer));
        assert_eq!(round(&f.session).buzz_list.len(), 1);
        assert_eq!(
            round(&f.session).current_buzz.as_ref().map(|b| b.team_id),
            Some(f.blue)
        );
    }

    #[test]
    fn incorrect_answer_returns_to_reading_or_waiting() {
        let mut f = fixture(2, 0, settings());
        start_match(&mut f.session).unwrap();

        apply_round_event(
            &mut f.session,
            RoundEvent::Buzz {
                player_id: f.alice,
                team_id: f.red,
            },
        )
        .unwrap();
        let next =
            apply_round_event(&mut f.session, RoundEvent::ResolveTossup { correct: false });
        assert_eq!(next, Ok(RoundState::ProctorReading));
        assert_eq!(round(&f.session).buzz_list[0].correct, Some(false));
        assert!(round(&f.session).current_buzz.is_none());

        apply_round_event(
            &mut f.session,
            RoundEvent::Buzz {
                player_id: f.bob,
                team_id: f.blue,
            },
        )
        .unwrap();
        apply_round_event(&mut f.session, RoundEvent::FinishReading).unwrap();
        let next =
            apply_round_event(&mut f.session, RoundEvent::ResolveTossup { correct: false });
        assert_eq!(next, Ok(RoundState::AwaitingBuzz));
        assert_eq!(round(&f.session).buzz_list.len(), 2);
    }

    #[test]
    fn rereading_after_expiry_keeps_the_countdown_stopped() {
        let mut manual = settings();
        manual.auto_timeout = false;
        let mut f = fixture(1, 0, manual);
        start_match(&mut f.session).unwrap();
        apply_round_event(&mut f.session, RoundEvent::FinishReading).unwrap();

        let timer = &mut f.session.current_round_mut().unwrap().tossup_timer;
        while timer.active {
            timer.tick();
        }
        apply_round_event(
            &mut f.session,
            RoundEvent::Buzz {
                player_id: f.alice,
                team_id: f.red,
            },
        )
        .unwrap();
        let next = apply_round_event(&mut f.session, RoundEvent::FinishReading);

        assert_eq!(next, Ok(RoundState::AwaitingAnswer));
        assert!(!round(&f.session).tossup_timer.active);
        assert_eq!(round(&f.session).tossup_timer.remaining_seconds, 0);
    }

    #[test]
    fn correct_tossup_scores_and_runs_the_bonus() {
        let mut f = fixture(2, 2, settings());
        start_match(&mut f.session).unwrap();
        apply_round_event(&mut f.session, RoundEvent::FinishReading).unwrap();
        assert!(round(&f.session).tossup_timer.active);

        apply_round_event(
            &mut f.session,
            RoundEvent::Buzz {
                player_id: f.alice,
                team_id: f.red,
            },
        )
        .unwrap();
        let next = apply_round_event(&mut f.session, RoundEvent::ResolveTossup { correct: true });
        assert_eq!(next, Ok(RoundState::BonusReadingPreamble));
        assert!(!round(&f.session).tossup_timer.active);
        assert_eq!(f.session.team(f.red).map(|t| t.score), Some(10));

        apply_round_event(&mut f.session, RoundEvent::FinishBonusPreamble).unwrap();
        apply_round_event(&mut f.session, RoundEvent::FinishBonusPart).unwrap();
        assert!(round(&f.session).has_running_timer());
        let next =
            apply_round_event(&mut f.session, RoundEvent::ResolveBonusPart { correct: true });
        assert_eq!(next, Ok(RoundState::BonusReadingPart));

        apply_round_event(&mut f.session, RoundEvent::FinishBonusPart).unwrap();
        let next = apply_round_event(&mut f.session, RoundEvent::BonusTimeout);
        assert_eq!(next, Ok(RoundState::BonusCompleted));

        let progress = round(&f.session).bonus.clone().unwrap();
        assert_eq!(progress.results, vec![true, false]);
        assert_eq!(f.session.team(f.red).map(|t| t.score), Some(20));
        assert!(!round(&f.session).has_running_timer());
    }

    #[test]
    fn correct_tossup_without_bonus_completes_round() {
        let mut disabled = settings();
        disabled.bonuses_enabled = false;
        let mut f = fixture(2, 2, disabled);
        start_match(&mut f.session).unwrap();

        apply_round_event(
            &mut f.session,
            RoundEvent::Buzz {
                player_id: f.bob,
                team_id: f.blue,
            },
        )
        .unwrap();
        let next = apply_round_event(&mut f.session, RoundEvent::ResolveTossup { correct: true });
        assert_eq!(next, Ok(RoundState::Completed));
    }

    #[test]
    fn invalid_transition_leaves_round_untouched() {
        let mut f = fixture(2, 0, settings());
        start_match(&mut f.session).unwrap();
        let before = f.session.clone();

        let err = apply_round_event(&mut f.session, RoundEvent::TossupTimeout).unwrap_err();
        match err {
            MatchError::InvalidTransition(invalid) => {
                assert_eq!(invalid.from, RoundState::ProctorReading);
                assert_eq!(invalid.event, RoundEvent::TossupTimeout);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(f.session, before);
    }

    #[test]
    fn end_match_archives_current_round() {
        let mut f = fixture(3, 0, settings());
        start_match(&mut f.session).unwrap();
        advance_round(&mut f.session).unwrap();
        apply_round_event(
            &mut f.session,
            RoundEvent::Buzz {
                player_id: f.alice,
                team_id: f.red,
            },
        )
        .unwrap();

        end_match(&mut f.session).unwrap();
        assert_eq!(f.session.current_match.state, MatchState::Completed);
        assert!(f.session.current_match.current_round.is_none());
        let archived = &f.session.current_match.rounds[0];
        assert_eq!(archived.number, 1);
        assert_eq!(archived.buzz_list.len(), 1);
        assert_eq!(archived.buzz_list[0].correct, None);
    }
}
