//! Session aggregate: players, teams, the match and its rounds.
//!
//! Everything in here is plain data plus synchronous queries and mutations.
//! Lookups return `Option` so callers decide how absence maps to an error.

use std::time::SystemTime;

use rand::{Rng, distr::Alphanumeric, rng};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Length of the capability token handed to a player when joining.
const SECRET_LENGTH: usize = 32;

/// Rule set a session was created with; selects the default [`GameSettings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Timed tossups followed by bonuses.
    Quizbowl,
    /// Untimed tossups only.
    Casual,
}

/// Per-session knobs controlling timers and scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GameSettings {
    /// Mode the defaults were derived from.
    pub game_mode: GameMode,
    /// Seconds teams get to buzz once the proctor finished reading (0 disables).
    pub tossup_timer_seconds: u32,
    /// Seconds the bonus team gets to answer a part (0 disables).
    pub bonus_timer_seconds: u32,
    /// Whether an expired countdown produces a timeout without the proctor.
    pub auto_timeout: bool,
    /// Whether a correct tossup unlocks the matching bonus.
    pub bonuses_enabled: bool,
    /// Points awarded for a correct tossup.
    pub tossup_points: i32,
}

/// Role a player holds inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerMode {
    /// Watches the game without interacting.
    Spectator,
    /// May buzz in on tossups.
    Buzzer,
    /// Reads questions and judges answers.
    Proctor,
}

/// A participant of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Unique player identifier.
    pub id: Uuid,
    /// Capability token; blanked in every view sent to clients.
    pub secret: String,
    /// Name shown to the other players.
    pub display_name: String,
    /// Current role.
    pub mode: PlayerMode,
    /// Set for the first player to join, never changed afterwards.
    pub is_owner: bool,
    /// Joined without an authenticated identity.
    pub is_guest: bool,
    /// Identity resolved by the authentication layer, if any.
    pub user_id: Option<String>,
}

/// Data needed to add a player to a session.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    /// Name shown to the other players.
    pub display_name: String,
    /// Authenticated identity, if any.
    pub user_id: Option<String>,
}

/// A scoring team. Members are referenced by player id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Unique team identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Members in assignment order.
    pub player_ids: Vec<Uuid>,
    /// Running total over the match.
    pub score: i32,
}

/// Question content for a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// Catalog identifier.
    pub id: Uuid,
    /// Human readable packet name.
    pub name: String,
    /// Tossups in play order; round `n` plays `tossups[n]`.
    #[serde(default)]
    pub tossups: Vec<Tossup>,
    /// Bonuses in award order.
    #[serde(default)]
    pub bonuses: Vec<Bonus>,
}

/// A single question answered by the first team to buzz correctly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tossup {
    /// Text read by the proctor.
    pub question: String,
    /// Accepted answer.
    pub answer: String,
}

/// A multi-part question played by the team that won the tossup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bonus {
    /// Lead-in read before the first part.
    pub preamble: String,
    /// Parts in reading order.
    pub parts: Vec<BonusPart>,
}

/// One part of a [`Bonus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusPart {
    /// Text read by the proctor.
    pub question: String,
    /// Accepted answer.
    pub answer: String,
    /// Points awarded for a correct answer.
    pub value: i32,
}

/// Lifecycle of the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchState {
    /// Teams, roles and packet are being set up.
    Config,
    /// Rounds are being played.
    InGame,
    /// Packet exhausted or match ended by the owner.
    Completed,
}

/// Sub-state of the round being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundState {
    /// Proctor is reading the tossup; early buzzes are allowed.
    ProctorReading,
    /// Tossup read; waiting for a buzz while the countdown runs.
    AwaitingBuzz,
    /// A buzz is pending a ruling.
    AwaitingAnswer,
    /// Proctor is reading the bonus preamble.
    BonusReadingPreamble,
    /// Proctor is reading the current bonus part.
    BonusReadingPart,
    /// Bonus team is answering the current part.
    BonusAwaitingAnswer,
    /// Every bonus part has been ruled on.
    BonusCompleted,
    /// Tossup closed with no bonus to play.
    Completed,
}

/// A team's claim to answer the current tossup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buzz {
    /// Player who buzzed.
    pub player_id: Uuid,
    /// Team the player buzzed for.
    pub team_id: Uuid,
    /// `None` while active, or when superseded without a ruling.
    pub correct: Option<bool>,
}

/// Seconds-based countdown driven by the timer coordinator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    /// Whether the timer coordinator decrements it.
    pub active: bool,
    /// Whole seconds left.
    pub remaining_seconds: u32,
}

impl Countdown {
    /// Arm the countdown. A zero duration leaves it inactive.
    pub fn start(&mut self, seconds: u32) {
        self.active = seconds > 0;
        self.remaining_seconds = seconds;
    }

    /// Stop and zero the countdown.
    pub fn clear(&mut self) {
        self.active = false;
        self.remaining_seconds = 0;
    }

    /// Consume one second. Returns `true` on the tick that reaches zero, after
    /// which the countdown is inactive.
    pub fn tick(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.active = false;
            return true;
        }
        false
    }
}

/// Progress through the bonus awarded to a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusProgress {
    /// Team playing the bonus.
    pub team_id: Uuid,
    /// Lead-in copied from the packet.
    pub preamble: String,
    /// Parts copied from the packet.
    pub parts: Vec<BonusPart>,
    /// Index of the part being read or answered.
    pub part_index: usize,
    /// Ruling for every part answered so far, in order.
    pub results: Vec<bool>,
    /// Answer countdown for the current part.
    pub timer: Countdown,
}

impl BonusProgress {
    /// Start `bonus` for `team_id` at its first part.
    pub fn new(team_id: Uuid, bonus: &Bonus) -> Self {
        Self {
            team_id,
            preamble: bonus.preamble.clone(),
            parts: bonus.parts.clone(),
            part_index: 0,
            results: Vec::new(),
            timer: Countdown::default(),
        }
    }

    /// Part being read or answered, `None` once every part is done.
    pub fn current_part(&self) -> Option<&BonusPart> {
        self.parts.get(self.part_index)
    }
}

/// One tossup (and possibly its bonus) being played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Zero-based index of the tossup in the packet.
    pub number: u32,
    /// Sub-state of the round.
    pub state: RoundState,
    /// Tossup text.
    pub question: String,
    /// Tossup answer.
    pub answer: String,
    /// Set once the proctor has read the whole tossup aloud.
    pub proctor_finished_reading: bool,
    /// Buzz awaiting a ruling.
    pub current_buzz: Option<Buzz>,
    /// Resolved or superseded buzzes, oldest first. Append-only.
    pub buzz_list: Vec<Buzz>,
    /// Buzz countdown, paused while an answer is pending.
    pub tossup_timer: Countdown,
    /// Bonus being played, once a team earned it.
    pub bonus: Option<BonusProgress>,
}

impl Round {
    /// Build a fresh round in [`RoundState::ProctorReading`] for `tossup`.
    pub fn new(number: u32, tossup: &Tossup) -> Self {
        Self {
            number,
            state: RoundState::ProctorReading,
            question: tossup.question.clone(),
            answer: tossup.answer.clone(),
            proctor_finished_reading: false,
            current_buzz: None,
            buzz_list: Vec::new(),
            tossup_timer: Countdown::default(),
            bonus: None,
        }
    }

    /// Whether any countdown of this round still needs ticking.
    pub fn has_running_timer(&self) -> bool {
        self.tossup_timer.active || self.bonus.as_ref().is_some_and(|bonus| bonus.timer.active)
    }

    /// Whether `team_id` already used its attempt on this tossup.
    pub fn team_has_buzzed(&self, team_id: Uuid) -> bool {
        self.buzz_list
            .iter()
            .chain(self.current_buzz.iter())
            .any(|buzz| buzz.team_id == team_id)
    }

    /// Move the active buzz, if any, into the append-only history.
    pub fn archive_current_buzz(&mut self) -> Option<&Buzz> {
        let buzz = self.current_buzz.take()?;
        self.buzz_list.push(buzz);
        self.buzz_list.last()
    }
}

/// The match played inside a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Lifecycle state.
    pub state: MatchState,
    /// Packet selected in the lobby.
    pub packet: Option<Packet>,
    /// Completed rounds in the order they were played.
    pub rounds: Vec<Round>,
    /// Round being played.
    pub current_round: Option<Round>,
}

impl Default for Match {
    fn default() -> Self {
        Self {
            state: MatchState::Config,
            packet: None,
            rounds: Vec::new(),
            current_round: None,
        }
    }
}

/// Final standing of a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TeamScore {
    /// Team identifier.
    pub team_id: Uuid,
    /// Team display name.
    pub name: String,
    /// Points earned over the match.
    pub score: i32,
}

/// Aggregated state for a live game session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSession {
    /// Primary key of the session.
    pub id: Uuid,
    /// Short shareable code used to join; stored uppercase.
    pub join_code: String,
    /// Creation instant, used by the retention sweep.
    pub created_at: SystemTime,
    /// Rules in effect for the match.
    pub settings: GameSettings,
    /// Players in join order.
    pub players: Vec<Player>,
    /// Teams in creation order.
    pub teams: Vec<Team>,
    /// The one match of this session.
    pub current_match: Match,
}

impl GameSession {
    /// Build an empty session in match state [`MatchState::Config`].
    pub fn new(join_code: String, settings: GameSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            join_code: join_code.to_ascii_uppercase(),
            created_at: SystemTime::now(),
            settings,
            players: Vec::new(),
            teams: Vec::new(),
            current_match: Match::default(),
        }
    }

    /// Look up a player by id.
    pub fn player(&self, id: Uuid) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }

    /// Mutable lookup of a player by id.
    pub fn player_mut(&mut self, id: Uuid) -> Option<&mut Player> {
        self.players.iter_mut().find(|player| player.id == id)
    }

    /// Look up a team by id.
    pub fn team(&self, id: Uuid) -> Option<&Team> {
        self.teams.iter().find(|team| team.id == id)
    }

    /// Mutable lookup of a team by id.
    pub fn team_mut(&mut self, id: Uuid) -> Option<&mut Team> {
        self.teams.iter_mut().find(|team| team.id == id)
    }

    /// Team the player belongs to, if any.
    pub fn team_of_player(&self, player_id: Uuid) -> Option<&Team> {
        self.teams
            .iter()
            .find(|team| team.player_ids.contains(&player_id))
    }

    /// The player currently holding [`PlayerMode::Proctor`].
    pub fn proctor(&self) -> Option<&Player> {
        self.players
            .iter()
            .find(|player| player.mode == PlayerMode::Proctor)
    }

    /// `false` for unknown ids.
    pub fn is_owner(&self, player_id: Uuid) -> bool {
        self.player(player_id).is_some_and(|player| player.is_owner)
    }

    /// Role of the player, `None` for unknown ids.
    pub fn player_mode(&self, player_id: Uuid) -> Option<PlayerMode> {
        self.player(player_id).map(|player| player.mode)
    }

    /// Ids of every player except `excluded`, in join order.
    pub fn players_except(&self, excluded: Uuid) -> Vec<Uuid> {
        self.players
            .iter()
            .map(|player| player.id)
            .filter(|id| *id != excluded)
            .collect()
    }

    /// Add a player with a fresh id and secret. The first joiner becomes owner.
    pub fn add_player(&mut self, request: JoinRequest) -> &Player {
        let is_owner = self.players.is_empty();
        self.players.push(Player {
            id: Uuid::new_v4(),
            secret: generate_secret(),
            display_name: request.display_name,
            mode: PlayerMode::Spectator,
            is_owner,
            is_guest: request.user_id.is_none(),
            user_id: request.user_id,
        });
        &self.players[self.players.len() - 1]
    }

    /// Change a player's mode, returning the previous one.
    ///
    /// Promoting to proctor demotes the current proctor to spectator and
    /// removes the new proctor from its team.
    pub fn set_player_mode(&mut self, player_id: Uuid, mode: PlayerMode) -> Option<PlayerMode> {
        let previous = self.player_mode(player_id)?;
        if mode == PlayerMode::Proctor {
            for player in &mut self.players {
                if player.mode == PlayerMode::Proctor && player.id != player_id {
                    player.mode = PlayerMode::Spectator;
                }
            }
            self.leave_team(player_id);
        }
        if let Some(player) = self.player_mut(player_id) {
            player.mode = mode;
        }
        Some(previous)
    }

    /// Put the player on `team_id`, or on no team when `None`.
    pub fn assign_team(&mut self, player_id: Uuid, team_id: Option<Uuid>) {
        self.leave_team(player_id);
        if let Some(team) = team_id.and_then(|id| self.team_mut(id)) {
            team.player_ids.push(player_id);
        }
    }

    /// Add an empty team and return its id.
    pub fn create_team(&mut self, name: String) -> Uuid {
        let id = Uuid::new_v4();
        self.teams.push(Team {
            id,
            name,
            player_ids: Vec::new(),
            score: 0,
        });
        id
    }

    /// Delete a team, returning it when it existed.
    pub fn remove_team(&mut self, team_id: Uuid) -> Option<Team> {
        let index = self.teams.iter().position(|team| team.id == team_id)?;
        Some(self.teams.remove(index))
    }

    /// Round being played, if any.
    pub fn current_round(&self) -> Option<&Round> {
        self.current_match.current_round.as_ref()
    }

    /// Mutable access to the round being played.
    pub fn current_round_mut(&mut self) -> Option<&mut Round> {
        self.current_match.current_round.as_mut()
    }

    /// Whether the timer coordinator should keep ticking this session.
    pub fn has_running_timer(&self) -> bool {
        self.current_match.state == MatchState::InGame
            && self.current_round().is_some_and(Round::has_running_timer)
    }

    /// Team standings, highest score first.
    pub fn scoreboard(&self) -> Vec<TeamScore> {
        let mut scores: Vec<TeamScore> = self
            .teams
            .iter()
            .map(|team| TeamScore {
                team_id: team.id,
                name: team.name.clone(),
                score: team.score,
            })
            .collect();
        scores.sort_by(|a, b| b.score.cmp(&a.score));
        scores
    }

    fn leave_team(&mut self, player_id: Uuid) {
        for team in &mut self.teams {
            team.player_ids.retain(|id| *id != player_id);
        }
    }
}

fn generate_secret() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn settings() -> GameSettings {
        GameSettings {
            game_mode: GameMode::Quizbowl,
            tossup_timer_seconds: 5,
            bonus_timer_seconds: 5,
            auto_timeout: true,
            bonuses_enabled: true,
            tossup_points: 10,
        }
    }

    fn join(session: &mut GameSession, name: &str) -> Uuid {
        session
            .add_player(JoinRequest {
                display_name: name.into(),
                user_id: None,
            })
            .id
    }

    #[test]
    fn first_joiner_is_sole_owner() {
        let mut session = GameSession::new("abc123".into(), settings());
        let alice = join(&mut session, "alice");
        let bob = join(&mut session, "bob");

        assert!(session.is_owner(alice));
        assert!(!session.is_owner(bob));
        assert!(!session.is_owner(Uuid::new_v4()));
        assert_eq!(session.join_code, "ABC123");
    }

    #[test]
    fn joined_players_default_to_spectators_with_secrets() {
        let mut session = GameSession::new("ABC123".into(), settings());
        let player = session
            .add_player(JoinRequest {
                display_name: "carol".into(),
                user_id: Some("user-7".into()),
            })
            .clone();

        assert_eq!(player.mode, PlayerMode::Spectator);
        assert_eq!(player.secret.len(), SECRET_LENGTH);
        assert!(!player.is_guest);
        assert_eq!(session.player_mode(player.id), Some(PlayerMode::Spectator));
    }

    #[test]
    fn lookups_report_absence() {
        let session = GameSession::new("ABC123".into(), settings());
        let unknown = Uuid::new_v4();

        assert!(session.player(unknown).is_none());
        assert!(session.team(unknown).is_none());
        assert!(session.team_of_player(unknown).is_none());
        assert!(session.proctor().is_none());
        assert!(session.player_mode(unknown).is_none());
    }

    #[test]
    fn only_one_proctor_at_a_time() {
        let mut session = GameSession::new("ABC123".into(), settings());
        let alice = join(&mut session, "alice");
        let bob = join(&mut session, "bob");

        session.set_player_mode(alice, PlayerMode::Proctor);
        session.set_player_mode(bob, PlayerMode::Proctor);

        assert_eq!(session.proctor().map(|p| p.id), Some(bob));
        assert_eq!(session.player_mode(alice), Some(PlayerMode::Spectator));
    }

    #[test]
    fn player_belongs_to_at_most_one_team() {
        let mut session = GameSession::new("ABC123".into(), settings());
        let alice = join(&mut session, "alice");
        let red = session.create_team("red".into());
        let blue = session.create_team("blue".into());

        session.assign_team(alice, Some(red));
        session.assign_team(alice, Some(blue));

        assert_eq!(session.team_of_player(alice).map(|t| t.id), Some(blue));
        assert!(session.team(red).is_some_and(|t| t.player_ids.is_empty()));

        session.set_player_mode(alice, PlayerMode::Proctor);
        assert!(session.team_of_player(alice).is_none());
    }

    #[test]
    fn countdown_expires_once() {
        let mut countdown = Countdown::default();
        countdown.start(2);
        assert!(!countdown.tick());
        assert!(countdown.tick());
        assert!(!countdown.active);
        assert!(!countdown.tick());

        countdown.start(0);
        assert!(!countdown.active);
    }
}
