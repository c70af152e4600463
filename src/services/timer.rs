//! Second-granularity countdowns for tossups and bonus parts.
//!
//! Only sessions in the [`TimerRegistry`] are visited on each sweep. Expired
//! countdowns with `auto_timeout` produce a synthetic timeout action from the
//! proctor, handled through the same locked path as player actions.

use std::{sync::Arc, time::Duration};

use dashmap::DashSet;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        action::{ActionKind, InboundAction},
        event::{OutboundMessage, ServerEvent, TimerKind},
    },
    error::DispatchError,
    services::dispatcher::Dispatcher,
    state::game::{GameSession, RoundState},
};

/// Ids of sessions whose current round has a running countdown.
#[derive(Clone, Default)]
pub struct TimerRegistry {
    sessions: Arc<DashSet<Uuid>>,
}

impl TimerRegistry {
    /// Register or unregister `session` depending on its countdowns.
    pub fn refresh(&self, session: &GameSession) {
        if session.has_running_timer() {
            self.sessions.insert(session.id);
        } else {
            self.sessions.remove(&session.id);
        }
    }

    /// Stop ticking `session_id`.
    pub fn remove(&self, session_id: Uuid) {
        self.sessions.remove(&session_id);
    }

    /// Whether `session_id` is ticking.
    pub fn contains(&self, session_id: Uuid) -> bool {
        self.sessions.contains(&session_id)
    }

    /// Ids registered right now.
    pub fn snapshot(&self) -> Vec<Uuid> {
        self.sessions.iter().map(|id| *id).collect()
    }

    /// Number of ticking sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is ticking.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Drives the countdowns of every registered session.
pub struct TimerCoordinator {
    dispatcher: Dispatcher,
    interval: Duration,
}

impl TimerCoordinator {
    /// Coordinator ticking once per `interval`.
    pub fn new(dispatcher: Dispatcher, interval: Duration) -> Self {
        Self {
            dispatcher,
            interval,
        }
    }

    /// Re-register sessions that still had a countdown running, e.g. after a restart.
    pub async fn recover(&self) -> Result<usize, DispatchError> {
        let sessions = self.dispatcher.store().list_active().await?;
        for session in &sessions {
            self.dispatcher.timers().refresh(session);
        }
        if !sessions.is_empty() {
            info!(count = sessions.len(), "recovered running timers");
        }
        Ok(sessions.len())
    }

    /// Tick forever at the configured interval.
    pub async fn run(self) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// One sweep over the registry. Returns how many sessions were visited.
    pub async fn tick(&self) -> usize {
        let ids = self.dispatcher.timers().snapshot();
        for id in &ids {
            if let Err(err) = self.tick_session(*id).await {
                warn!(session = %id, error = %err, "timer tick failed");
            }
        }
        ids.len()
    }

    async fn tick_session(&self, session_id: Uuid) -> Result<(), DispatchError> {
        let _guard = self.dispatcher.locks().acquire(session_id).await;

        let Some(mut session) = self.dispatcher.store().get(session_id).await? else {
            self.dispatcher.timers().remove(session_id);
            return Ok(());
        };

        let Some(tick) = advance_countdown(&mut session) else {
            self.dispatcher.timers().refresh(&session);
            return Ok(());
        };

        let mut messages = vec![OutboundMessage::broadcast(ServerEvent::TimerUpdated {
            timer: tick.timer,
            remaining_seconds: tick.remaining_seconds,
        })];

        if tick.expired && session.settings.auto_timeout {
            messages.extend(self.synthesize_timeout(&mut session, tick.timer).await);
        }

        self.dispatcher.commit(&session, messages).await?;
        Ok(())
    }

    /// Run a timeout on behalf of the proctor. On failure the session keeps
    /// the countdown update only.
    async fn synthesize_timeout(
        &self,
        session: &mut GameSession,
        timer: TimerKind,
    ) -> Vec<OutboundMessage> {
        let Some(proctor) = session.proctor().map(|player| player.id) else {
            warn!(session = %session.id, "countdown expired without a proctor");
            return Vec::new();
        };
        let kind = match timer {
            TimerKind::Tossup => ActionKind::TossupTimeout,
            TimerKind::Bonus => ActionKind::BonusTimeout,
        };
        let action = InboundAction::new(proctor, session.id, kind);

        let mut candidate = session.clone();
        match self.dispatcher.run_handler(&action, &mut candidate).await {
            Ok(outcome) => {
                debug!(session = %session.id, timer = ?timer, "synthesized timeout");
                *session = candidate;
                outcome.into_messages()
            }
            Err(err) => {
                warn!(
                    session = %session.id,
                    action = action.action.type_name(),
                    error = %err,
                    "dropping synthetic timeout"
                );
                Vec::new()
            }
        }
    }
}

struct CountdownTick {
    timer: TimerKind,
    remaining_seconds: u32,
    expired: bool,
}

/// Consume one second of whichever countdown is live in the current round state.
fn advance_countdown(session: &mut GameSession) -> Option<CountdownTick> {
    let round = session.current_round_mut()?;
    match round.state {
        RoundState::AwaitingBuzz if round.tossup_timer.active => {
            let expired = round.tossup_timer.tick();
            Some(CountdownTick {
                timer: TimerKind::Tossup,
                remaining_seconds: round.tossup_timer.remaining_seconds,
                expired,
            })
        }
        RoundState::BonusAwaitingAnswer => {
            let progress = round.bonus.as_mut()?;
            if !progress.timer.active {
                return None;
            }
            let expired = progress.timer.tick();
            Some(CountdownTick {
                timer: TimerKind::Bonus,
                remaining_seconds: progress.timer.remaining_seconds,
                expired,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        game::{JoinRequest, Packet, PlayerMode, Tossup, tests::settings},
        state_machine::{self, RoundEvent},
    };

    fn waiting_session() -> GameSession {
        let mut session = GameSession::new("TICK01".into(), settings());
        let proctor = session
            .add_player(JoinRequest {
                display_name: "proctor".into(),
                user_id: None,
            })
            .id;
        session.set_player_mode(proctor, PlayerMode::Proctor);
        session.current_match.packet = Some(Packet {
            id: Uuid::new_v4(),
            name: "p".into(),
            tossups: vec![Tossup {
                question: "q".into(),
                answer: "a".into(),
            }],
            bonuses: vec![],
        });
        state_machine::start_match(&mut session).unwrap();
        state_machine::apply_round_event(&mut session, RoundEvent::FinishReading).unwrap();
        session
    }

    #[test]
    fn registry_tracks_running_countdowns() {
        let registry = TimerRegistry::default();
        let mut session = waiting_session();

        registry.refresh(&session);
        assert!(registry.contains(session.id));

        session.current_round_mut().unwrap().tossup_timer.clear();
        registry.refresh(&session);
        assert!(registry.is_empty());
    }

    #[test]
    fn countdown_only_moves_while_awaiting_a_buzz() {
        let mut session = waiting_session();

        let tick = advance_countdown(&mut session).unwrap();
        assert_eq!(tick.timer, TimerKind::Tossup);
        assert_eq!(tick.remaining_seconds, 4);
        assert!(!tick.expired);

        session.current_round_mut().unwrap().state = RoundState::AwaitingAnswer;
        assert!(advance_countdown(&mut session).is_none());
        assert_eq!(
            session.current_round().unwrap().tossup_timer.remaining_seconds,
            4
        );
    }
}
