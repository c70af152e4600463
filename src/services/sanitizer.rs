//! Role-filtered copies of a session for transmission to clients.
//!
//! Copies are rebuilt field by field; the canonical session is never touched.

use crate::state::game::{GameSession, Match, Packet, Player, PlayerMode, Round};

/// Copy of `session` fit for a viewer holding `viewer` mode.
///
/// Secrets are blanked for everyone. Non-proctors additionally lose the
/// packet's tossups and bonuses and the current round's question text.
pub fn sanitize_session(session: &GameSession, viewer: PlayerMode) -> GameSession {
    let players = session.players.iter().map(blank_secret).collect();
    let current_match = Match {
        state: session.current_match.state,
        packet: session
            .current_match
            .packet
            .as_ref()
            .map(|packet| sanitize_packet(packet, viewer)),
        rounds: session.current_match.rounds.clone(),
        current_round: session
            .current_match
            .current_round
            .as_ref()
            .map(|round| sanitize_round(round, viewer)),
    };

    GameSession {
        id: session.id,
        join_code: session.join_code.clone(),
        created_at: session.created_at,
        settings: session.settings.clone(),
        players,
        teams: session.teams.clone(),
        current_match,
    }
}

/// Copy of `round` with question and answer text removed for non-proctors.
pub fn sanitize_round(round: &Round, viewer: PlayerMode) -> Round {
    let mut copy = round.clone();
    if viewer == PlayerMode::Proctor {
        return copy;
    }
    copy.question.clear();
    copy.answer.clear();
    if let Some(bonus) = copy.bonus.as_mut() {
        bonus.preamble.clear();
        for part in &mut bonus.parts {
            part.question.clear();
            part.answer.clear();
        }
    }
    copy
}

fn sanitize_packet(packet: &Packet, viewer: PlayerMode) -> Packet {
    let full = viewer == PlayerMode::Proctor;
    Packet {
        id: packet.id,
        name: packet.name.clone(),
        tossups: if full { packet.tossups.clone() } else { Vec::new() },
        bonuses: if full { packet.bonuses.clone() } else { Vec::new() },
    }
}

fn blank_secret(player: &Player) -> Player {
    Player {
        id: player.id,
        secret: String::new(),
        display_name: player.display_name.clone(),
        mode: player.mode,
        is_owner: player.is_owner,
        is_guest: player.is_guest,
        user_id: player.user_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::state::{
        game::{Bonus, BonusPart, JoinRequest, Tossup, tests::settings},
        state_machine::start_match,
    };

    fn live_session() -> GameSession {
        let mut session = GameSession::new("VIEW01".into(), settings());
        for name in ["owner", "alice"] {
            session.add_player(JoinRequest {
                display_name: name.into(),
                user_id: None,
            });
        }
        let owner = session.players[0].id;
        let alice = session.players[1].id;
        session.set_player_mode(owner, PlayerMode::Proctor);
        let team = session.create_team("red".into());
        session.assign_team(alice, Some(team));
        session.current_match.packet = Some(Packet {
            id: Uuid::new_v4(),
            name: "finals".into(),
            tossups: vec![Tossup {
                question: "Which planet?".into(),
                answer: "Mars".into(),
            }],
            bonuses: vec![Bonus {
                preamble: "About moons".into(),
                parts: vec![BonusPart {
                    question: "Largest?".into(),
                    answer: "Ganymede".into(),
                    value: 10,
                }],
            }],
        });
        start_match(&mut session).unwrap();
        session
    }

    #[test]
    fn proctor_view_keeps_content_but_not_secrets() {
        let session = live_session();
        let view = sanitize_session(&session, PlayerMode::Proctor);

        assert!(view.players.iter().all(|player| player.secret.is_empty()));
        let packet = view.current_match.packet.unwrap();
        assert_eq!(packet.tossups.len(), 1);
        assert_eq!(packet.bonuses.len(), 1);
        let round = view.current_match.current_round.unwrap();
        assert_eq!(round.question, "Which planet?");
        assert_eq!(round.answer, "Mars");
    }

    #[test]
    fn other_roles_lose_question_content() {
        let session = live_session();
        for viewer in [PlayerMode::Buzzer, PlayerMode::Spectator] {
            let view = sanitize_session(&session, viewer);

            assert!(view.players.iter().all(|player| player.secret.is_empty()));
            let packet = view.current_match.packet.unwrap();
            assert_eq!(packet.name, "finals");
            assert!(packet.tossups.is_empty());
            assert!(packet.bonuses.is_empty());
            let round = view.current_match.current_round.unwrap();
            assert!(round.question.is_empty());
            assert!(round.answer.is_empty());
        }
    }

    #[test]
    fn canonical_session_is_untouched() {
        let session = live_session();
        let before = session.clone();
        let _ = sanitize_session(&session, PlayerMode::Spectator);

        assert_eq!(session, before);
        assert!(session.players.iter().all(|player| !player.secret.is_empty()));
    }
}
