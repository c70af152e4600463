use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::game::{CreateGameRequest, JoinGameRequest, JoinedGame, PacketSummary},
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Routes handling session bootstrap (creation & joining).
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", post(create_game))
        .route("/games/join", post(join_game))
        .route("/packets", get(list_packets))
}

/// Open a new session; the caller becomes its owner.
#[utoipa::path(
    post,
    path = "/games",
    tag = "game",
    request_body = CreateGameRequest,
    responses(
        (status = 200, description = "Session created", body = JoinedGame),
        (status = 400, description = "Invalid payload")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateGameRequest>>,
) -> Result<Json<JoinedGame>, AppError> {
    let joined = game_service::create_game(&state, payload).await?;
    Ok(Json(joined))
}

/// Join an existing session by its code.
#[utoipa::path(
    post,
    path = "/games/join",
    tag = "game",
    request_body = JoinGameRequest,
    responses(
        (status = 200, description = "Joined the session", body = JoinedGame),
        (status = 404, description = "No session uses this code")
    )
)]
pub async fn join_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<JoinGameRequest>>,
) -> Result<Json<JoinedGame>, AppError> {
    let joined = game_service::join_game(&state, payload).await?;
    Ok(Json(joined))
}

/// List the packets an owner can select.
#[utoipa::path(
    get,
    path = "/packets",
    tag = "game",
    responses((status = 200, description = "Packet catalog", body = [PacketSummary]))
)]
pub async fn list_packets(State(state): State<SharedState>) -> Json<Vec<PacketSummary>> {
    Json(game_service::list_packets(&state))
}
