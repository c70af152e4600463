use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Inbound player actions.
pub mod action;
/// Outbound server events.
pub mod event;
/// Session bootstrap payloads.
pub mod game;
/// Health check payload.
pub mod health;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
