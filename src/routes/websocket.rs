use axum::{
    Router,
    extract::{Query, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    error::AppError,
    services::{game_service, websocket_service},
    state::SharedState,
};

/// Credentials a player presents when opening the socket.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ConnectParams {
    /// Session to connect to.
    pub game_session_id: Uuid,
    /// Player opening the socket.
    pub player_id: Uuid,
    /// Capability token returned when joining.
    pub secret: String,
}

#[utoipa::path(
    get,
    path = "/ws",
    tag = "players",
    params(ConnectParams),
    responses(
        (status = 101, description = "Switching protocols to WebSocket"),
        (status = 401, description = "Invalid player credentials"),
        (status = 404, description = "Unknown session")
    )
)]
/// Upgrade the HTTP connection into a player WebSocket after checking the secret.
pub async fn ws_handler(
    State(state): State<SharedState>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    game_service::authenticate(
        &state,
        params.game_session_id,
        params.player_id,
        &params.secret,
    )
    .await?;

    let shared_state = state.clone();
    Ok(ws.on_upgrade(move |socket| {
        websocket_service::handle_socket(
            shared_state,
            socket,
            params.game_session_id,
            params.player_id,
        )
    }))
}

/// Configure the WebSocket endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/ws", get(ws_handler))
}
