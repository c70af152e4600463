/// Routing of player actions under the per-session lock.
pub mod dispatcher;
/// OpenAPI documentation generation.
pub mod documentation;
/// Session creation, joining and socket authentication.
pub mod game_service;
/// One handler per action type.
pub mod handlers;
/// Health check service.
pub mod health_service;
/// Role-filtered views of a session.
pub mod sanitizer;
/// Countdown sweeps and synthetic timeouts.
pub mod timer;
/// WebSocket bridge between a player and the bus.
pub mod websocket_service;
/// Bus consumer partitioning actions across workers.
pub mod worker_pool;
