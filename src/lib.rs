//! Library crate for trivia-buzz-back, exposing modules for binaries and integration tests.

pub mod config;
/// Storage backends and packet content.
pub mod dao;
/// Wire types exchanged with clients.
pub mod dto;
/// Error taxonomy for actions, services and HTTP.
pub mod error;
/// HTTP and WebSocket routes.
pub mod routes;
/// Application services.
pub mod services;
/// Shared state and the session model.
pub mod state;
