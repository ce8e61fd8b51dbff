//! Mapping of engine errors onto HTTP responses.

use axum::{Json, http::StatusCode};
use league_brackets::tournament::{BracketError, ErrorKind};
use serde::{Deserialize, Serialize};

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Rejection type of all handlers
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::State | ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert an engine error, logging internal failures in full
pub fn bracket_error(err: BracketError) -> ApiError {
    let status = status_for(err.kind());
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "Bracket operation failed");
    }
    (
        status,
        Json(ErrorResponse {
            error: err.client_message(),
            code: err.code().to_string(),
        }),
    )
}

/// A request the engine never saw, rejected at the API boundary
pub fn invalid_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
            code: "INVALID_REQUEST".to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use league_brackets::tournament::TournamentStatus;

    #[test]
    fn test_status_mapping() {
        let (status, body) = bracket_error(BracketError::TournamentNotFound(9));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "NOT_FOUND");

        let (status, body) = bracket_error(BracketError::TieNotAllowed(1));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "TIE_NOT_ALLOWED");

        let (status, _) = bracket_error(BracketError::InvalidState {
            expected: TournamentStatus::Created,
            actual: TournamentStatus::InProgress,
        });
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = bracket_error(BracketError::StartConflict(3));
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[test]
    fn test_invalid_request() {
        let (status, body) = invalid_request("bad body");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "bad body");
        assert_eq!(body.code, "INVALID_REQUEST");
    }
}
