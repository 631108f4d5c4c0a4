use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// ApiError
///
/// The application-wide error taxonomy. Every handler returns `Result<_, ApiError>`,
/// and the `IntoResponse` implementation below is the single place where outcomes
/// are mapped to HTTP status codes:
///
/// | Variant      | Status |
/// |--------------|--------|
/// | BadRequest   | 400    |
/// | Unauthorized | 401    |
/// | Forbidden    | 403    |
/// | NotFound     | 404    |
/// | Conflict     | 409    |
/// | Database     | 500    |
///
/// All variants are terminal. The only caller-retryable case is `Conflict` raised
/// by a lost tag-creation race, which a client may retry once.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ApiError::Conflict(msg.into())
    }

    /// db
    ///
    /// Maps a store error to the taxonomy with a caller-supplied conflict message.
    /// A unique-constraint violation (duplicate email, duplicate tag name) becomes
    /// `Conflict`; anything else is an opaque `Database` error.
    pub fn db(err: sqlx::Error, conflict_msg: &str) -> Self {
        if is_unique_violation(&err) {
            ApiError::Conflict(conflict_msg.to_string())
        } else {
            ApiError::Database(err)
        }
    }
}

/// Default store-error mapping used by `?` in the repository. Unique-constraint
/// violations surface as a retryable 409; everything else is a 500.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if is_unique_violation(&err) {
            ApiError::Conflict("resource already exists".to_string())
        } else {
            ApiError::Database(err)
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::Database(err) => {
                // Log the underlying store error but never leak it to the client.
                tracing::error!("database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
