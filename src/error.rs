use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, state::bus::BusError, state::state_machine::MatchError};

/// Machine-readable category of an [`ActionError`], sent to the originating player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ErrorKind {
    /// Session, player, team or packet is absent.
    EntityNotFound,
    /// Actor lacks the required role.
    PermissionDenied,
    /// Action arrived in a state that does not accept it.
    WrongState,
    /// Request content or session setup is invalid.
    ValidationFailure,
    /// Action type is not recognised.
    UnknownActionType,
}

/// Errors a handler reports for a player action. They never escape the
/// dispatcher: each one becomes an error message for the originator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// Session, player, team or packet is absent.
    #[error("not found: {0}")]
    EntityNotFound(String),
    /// Actor lacks the required role or ownership.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// Match or round does not permit the action right now.
    #[error("wrong state: {0}")]
    WrongState(String),
    /// Request is malformed or setup is incomplete.
    #[error("validation failed: {0}")]
    ValidationFailure(String),
    /// No handler is registered for the action type.
    #[error("unknown action type")]
    UnknownActionType,
}

impl ActionError {
    /// Category reported to the client.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ActionError::EntityNotFound(_) => ErrorKind::EntityNotFound,
            ActionError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            ActionError::WrongState(_) => ErrorKind::WrongState,
            ActionError::ValidationFailure(_) => ErrorKind::ValidationFailure,
            ActionError::UnknownActionType => ErrorKind::UnknownActionType,
        }
    }
}

impl From<MatchError> for ActionError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::WrongMatchState { .. }
            | MatchError::NoCurrentRound
            | MatchError::InvalidTransition(_) => ActionError::WrongState(err.to_string()),
            MatchError::MissingPacket
            | MatchError::EmptyPacket
            | MatchError::MissingProctor
            | MatchError::EmptyTeam { .. } => ActionError::ValidationFailure(err.to_string()),
        }
    }
}

impl From<ValidationErrors> for ActionError {
    fn from(err: ValidationErrors) -> Self {
        ActionError::ValidationFailure(err.to_string())
    }
}

/// Infrastructure failures that abort processing of an action.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Session store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Outbound publish failed.
    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Message bus rejected a publish.
    #[error("message bus unavailable")]
    Bus(#[source] BusError),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<DispatchError> for ServiceError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Storage(source) => ServiceError::Unavailable(source),
            DispatchError::Bus(source) => ServiceError::Bus(source),
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Bus(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{game::RoundState, state_machine::{InvalidTransition, RoundEvent}};

    #[test]
    fn match_errors_map_onto_the_action_taxonomy() {
        let wrong = ActionError::from(MatchError::InvalidTransition(InvalidTransition {
            from: RoundState::Completed,
            event: RoundEvent::TossupTimeout,
        }));
        assert_eq!(wrong.kind(), ErrorKind::WrongState);

        let missing = ActionError::from(MatchError::MissingProctor);
        assert_eq!(missing.kind(), ErrorKind::ValidationFailure);
    }
}
