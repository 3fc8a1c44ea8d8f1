use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::models::battle::BattleStatus;

/// Domain failures surfaced to API clients.
///
/// Validation failures carry a stable message and map to a distinct status
/// code; `Store` wraps an opaque persistence/transport error and always maps
/// to 500.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("missing or invalid credentials")]
    Unauthenticated,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    InvalidState(&'static str),
    #[error("{0} is full")]
    CapacityExceeded(&'static str),
    #[error("already joined this {0}")]
    AlreadyJoined(&'static str),
    #[error("already submitted this problem")]
    AlreadySubmitted,
    #[error("{0}")]
    Forbidden(&'static str),
    #[error(transparent)]
    Store(#[from] color_eyre::Report),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InvalidState(_)
            | ServiceError::CapacityExceeded(_)
            | ServiceError::AlreadyJoined(_)
            | ServiceError::AlreadySubmitted => StatusCode::BAD_REQUEST,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Join rejection for a battle that is past the `waiting` state.
    pub fn battle_not_joinable(status: BattleStatus) -> Self {
        match status {
            BattleStatus::Waiting => ServiceError::InvalidState("battle is not joinable"),
            BattleStatus::InProgress => ServiceError::InvalidState("battle already started"),
            BattleStatus::Completed | BattleStatus::Cancelled => {
                ServiceError::InvalidState("battle already ended")
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let ServiceError::Store(report) = &self {
            tracing::error!(error = ?report, "request failed with storage error");
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
