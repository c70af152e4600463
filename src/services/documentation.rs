use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Trivia Buzz Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::create_game,
        crate::routes::game::join_game,
        crate::routes::game::list_packets,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::JoinGameRequest,
            crate::dto::game::JoinedGame,
            crate::dto::game::PacketSummary,
            crate::state::game::GameMode,
            crate::state::game::GameSettings,
            crate::state::game::PlayerMode,
            crate::error::ErrorKind,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "game", description = "Session creation and joining"),
        (name = "players", description = "WebSocket bridge for players"),
    )
)]
/// OpenAPI document root.
pub struct ApiDoc;
