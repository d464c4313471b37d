use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::queries::QueryStatus;

/// Error returned by every handler and service in the crate.
///
/// Rejected lifecycle transitions carry the query's current status and the
/// statuses the operation would have accepted, so clients always learn why
/// a transition was refused.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("query is {current}; acceptable statuses: {}", status_list(.allowed))]
    InvalidTransition {
        current: QueryStatus,
        allowed: &'static [QueryStatus],
    },

    #[error("{0}")]
    Conflict(String),

    #[error("database error")]
    Db(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub fn status_list(statuses: &[QueryStatus]) -> String {
    statuses
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidTransition { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Db(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = ?self, "request failed");
        }
        let body = Json(json!({ "success": false, "message": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_names_current_and_acceptable_statuses() {
        let err = ApiError::InvalidTransition {
            current: QueryStatus::Resolved,
            allowed: &[QueryStatus::Unassigned, QueryStatus::Requested],
        };
        let msg = err.to_string();
        assert!(msg.contains("RESOLVED"));
        assert!(msg.contains("UNASSIGNED, REQUESTED"));
    }

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            ApiError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound("query").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::InvalidTransition {
                current: QueryStatus::Dismantled,
                allowed: &[QueryStatus::Assigned],
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn not_found_message_names_the_entity() {
        assert_eq!(ApiError::NotFound("query").to_string(), "query not found");
    }
}
