use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/health` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status, always "ok" while the process serves requests.
    pub status: String,
    /// Sessions with a countdown currently ticking.
    pub running_timers: usize,
}

impl HealthResponse {
    /// Healthy response.
    pub fn ok(running_timers: usize) -> Self {
        Self {
            status: "ok".to_string(),
            running_timers,
        }
    }
}
