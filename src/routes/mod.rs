use axum::Router;

use crate::state::SharedState;

/// Swagger UI and OpenAPI document.
pub mod docs;
/// Session creation, joining and packet listing.
pub mod game;
/// Liveness check.
pub mod health;
/// Player WebSocket upgrade.
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(websocket::router())
        .merge(game::router())
        .merge(docs::router())
        .with_state(state)
}
