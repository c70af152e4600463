use tracing::debug;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness together with the number of ticking sessions.
pub fn health_status(state: &SharedState) -> HealthResponse {
    let running_timers = state.dispatcher().timers().len();
    debug!(running_timers, "health check");
    HealthResponse::ok(running_timers)
}
