//! Session bootstrap: creation with a unique join code, joining by code and
//! socket authentication.

use rand::{Rng, rng};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::{session_store::SessionStore, storage::StorageError},
    dto::{
        event::{OutboundMessage, ServerEvent},
        game::{CreateGameRequest, JoinGameRequest, JoinedGame, PacketSummary},
    },
    error::ServiceError,
    services::handlers::session_messages,
    state::{
        SharedState,
        game::{GameSession, GameSettings, JoinRequest, Player},
    },
};

/// Unambiguous characters used in join codes (no I, O, 0 or 1).
const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const JOIN_CODE_LENGTH: usize = 6;
const MAX_JOIN_CODE_ATTEMPTS: usize = 32;

/// Random join code drawn from [`JOIN_CODE_ALPHABET`].
pub fn generate_join_code() -> String {
    let mut rng = rng();
    (0..JOIN_CODE_LENGTH)
        .map(|_| JOIN_CODE_ALPHABET[rng.random_range(0..JOIN_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Store a new session owned by `owner`, drawing codes from `next_code`
/// until one is free.
pub async fn create_session(
    store: &dyn SessionStore,
    settings: GameSettings,
    owner: JoinRequest,
    mut next_code: impl FnMut() -> String,
) -> Result<(GameSession, Player), ServiceError> {
    for attempt in 1..=MAX_JOIN_CODE_ATTEMPTS {
        let code = next_code().to_ascii_uppercase();
        if store.find_by_join_code(&code).await?.is_some() {
            debug!(attempt, code = %code, "join code taken; retrying");
            continue;
        }

        let mut session = GameSession::new(code, settings.clone());
        let player = session.add_player(owner.clone()).clone();
        match store.insert(session.clone()).await {
            Ok(()) => return Ok((session, player)),
            Err(StorageError::Conflict(_)) => {
                debug!(attempt, "join code claimed concurrently; retrying");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(ServiceError::InvalidState(
        "could not allocate a unique join code".into(),
    ))
}

/// Open a session for the requesting owner.
pub async fn create_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<JoinedGame, ServiceError> {
    let settings = state.config().settings_for(request.game_mode);
    let owner = JoinRequest {
        display_name: request.display_name.trim().to_string(),
        user_id: request.user_id,
    };
    let (session, player) =
        create_session(state.store().as_ref(), settings, owner, generate_join_code).await?;

    info!(
        session = %session.id,
        join_code = %session.join_code,
        mode = ?session.settings.game_mode,
        "game session created"
    );
    Ok(JoinedGame::new(&session, &player))
}

/// Add a player to the session behind `join_code` and tell everyone.
pub async fn join_game(
    state: &SharedState,
    request: JoinGameRequest,
) -> Result<JoinedGame, ServiceError> {
    let code = request.join_code.trim().to_ascii_uppercase();
    let Some(found) = state.store().find_by_join_code(&code).await? else {
        return Err(ServiceError::NotFound(format!("game `{code}` not found")));
    };

    let dispatcher = state.dispatcher();
    let _guard = dispatcher.locks().acquire(found.id).await;
    let Some(mut session) = state.store().get(found.id).await? else {
        return Err(ServiceError::NotFound(format!("game `{code}` not found")));
    };

    let player = session
        .add_player(JoinRequest {
            display_name: request.display_name.trim().to_string(),
            user_id: request.user_id,
        })
        .clone();
    let messages: Vec<OutboundMessage> =
        session_messages(&session, |session| ServerEvent::SessionUpdated { session });
    dispatcher.commit(&session, messages).await?;

    info!(session = %session.id, player = %player.id, "player joined");
    Ok(JoinedGame::new(&session, &player))
}

/// Check a player's capability token for `session_id`.
pub async fn authenticate(
    state: &SharedState,
    session_id: Uuid,
    player_id: Uuid,
    secret: &str,
) -> Result<(), ServiceError> {
    let Some(session) = state.store().get(session_id).await? else {
        return Err(ServiceError::NotFound(format!(
            "game `{session_id}` not found"
        )));
    };
    match session.player(player_id) {
        Some(player) if !secret.is_empty() && player.secret == secret => Ok(()),
        _ => Err(ServiceError::Unauthorized(
            "invalid player credentials".into(),
        )),
    }
}

/// Packets available for selection, in catalog order.
pub fn list_packets(state: &SharedState) -> Vec<PacketSummary> {
    state.packets().iter().map(PacketSummary::from).collect()
}
