use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Every failure the API surfaces, each with a stable error code so callers
/// can tell which stage of an operation failed.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Input data is invalid")]
    InvalidInput,

    #[error("{0}")]
    InvalidQueryParameter(String),

    #[error("Authorization header required")]
    MissingAuthHeader,

    #[error("Invalid Authorization header format")]
    InvalidAuthHeader,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("username or password incorrect")]
    InvalidCredential,

    #[error("A user with this email already exists")]
    UserAlreadyExists,

    #[error("The specified group could not be found")]
    GroupNotFound,

    #[error("The specified user could not be found")]
    UserNotFound,

    #[error("Users not found with email: {}", .0.join(", "))]
    UsersNotFound(Vec<String>),

    #[error("Users already in group: {}", .0.join(", "))]
    UsersAlreadyInGroup(Vec<String>),

    #[error("Payment has already been made by this user")]
    PaymentAlreadyMade,

    #[error("Failed to update payment status")]
    PaymentFailed,

    #[error("Failed to mark the bill as completed")]
    BillCompletionFailed,

    #[error("Failed to update group information")]
    GroupUpdateFailed,

    #[error("Failed to record bill history")]
    HistoryAppendFailed,

    #[error("An internal server error occurred")]
    Internal(#[source] anyhow::Error),

    #[error("An internal server error occurred")]
    Database(#[from] sqlx::Error),
}

/// Wire shape of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_FAILED",
            ApiError::InvalidInput => "INVALID_INPUT",
            ApiError::InvalidQueryParameter(_) => "INVALID_QUERY_PARAMETER",
            ApiError::MissingAuthHeader => "UNAUTHORIZATION_HEADER_NOT_FOUND",
            ApiError::InvalidAuthHeader => "INVALID_AUTH_HEADER",
            ApiError::InvalidToken => "INVALID_TOKEN",
            ApiError::InvalidCredential => "INVALID_CREDENTIAL",
            ApiError::UserAlreadyExists => "USER_ALREADY_EXISTS",
            ApiError::GroupNotFound => "GROUP_NOT_FOUND",
            ApiError::UserNotFound => "USER_NOT_FOUND",
            ApiError::UsersNotFound(_) => "USERS_NOT_FOUND",
            ApiError::UsersAlreadyInGroup(_) => "USERS_ALREADY_EXISTS",
            ApiError::PaymentAlreadyMade => "PAYMENT_ALREADY_MADE",
            ApiError::PaymentFailed => "PAYMENT_FAILED",
            ApiError::BillCompletionFailed => "BILL_COMPLETION_FAILED",
            ApiError::GroupUpdateFailed => "GROUP_UPDATE_FAILED",
            ApiError::HistoryAppendFailed => "BILL_HISTORY_FAILED",
            ApiError::Internal(_) | ApiError::Database(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::InvalidInput
            | ApiError::InvalidQueryParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::MissingAuthHeader
            | ApiError::InvalidAuthHeader
            | ApiError::InvalidToken
            | ApiError::InvalidCredential => StatusCode::UNAUTHORIZED,
            ApiError::GroupNotFound | ApiError::UserNotFound | ApiError::UsersNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ApiError::UserAlreadyExists
            | ApiError::UsersAlreadyInGroup(_)
            | ApiError::PaymentAlreadyMade => StatusCode::CONFLICT,
            ApiError::PaymentFailed
            | ApiError::BillCompletionFailed
            | ApiError::GroupUpdateFailed
            | ApiError::HistoryAppendFailed
            | ApiError::Internal(_)
            | ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_codes_are_distinct() {
        let stages = [
            ApiError::PaymentFailed.code(),
            ApiError::BillCompletionFailed.code(),
            ApiError::GroupUpdateFailed.code(),
            ApiError::HistoryAppendFailed.code(),
        ];
        for (i, a) in stages.iter().enumerate() {
            for b in &stages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn users_not_found_lists_emails() {
        let err = ApiError::UsersNotFound(vec!["a@x.com".into(), "b@x.com".into()]);
        assert_eq!(err.code(), "USERS_NOT_FOUND");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Users not found with email: a@x.com, b@x.com");
    }

    #[test]
    fn conflict_statuses() {
        assert_eq!(ApiError::PaymentAlreadyMade.status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::UsersAlreadyInGroup(vec!["a@x.com".into()]).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::UserAlreadyExists.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn body_serializes_code_and_message() {
        let body = ErrorBody {
            code: ApiError::GroupNotFound.code(),
            message: ApiError::GroupNotFound.to_string(),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("GROUP_NOT_FOUND"));
        assert!(json.contains("could not be found"));
    }
}
