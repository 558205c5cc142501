// HTTP API error types
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized - no valid session
    Unauthorized(String),

    // 403 Forbidden - valid session, insufficient role or scope
    Forbidden(String),

    // 404 Not Found - missing or filtered out by scope
    NotFound(String),

    // 409 Conflict - constraint violation translated to a user-facing message
    Conflict(String),

    // 429 Too Many Requests, with a Retry-After hint in seconds
    TooManyRequests { message: String, retry_after_secs: u64 },

    // 500 Internal Server Error - generic message, details stay server-side
    InternalServerError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::TooManyRequests { message, .. } => message,
            ApiError::InternalServerError(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::TooManyRequests { .. } => "TOO_MANY_REQUESTS",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code(),
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn too_many_requests(message: impl Into<String>, retry_after_secs: u64) -> Self {
        ApiError::TooManyRequests {
            message: message.into(),
            retry_after_secs,
        }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }
}

/// Translate a raw sqlx error into the client-facing taxonomy.
///
/// Unique and foreign-key violations become 409 Conflict with a human-readable
/// message; everything else is logged server-side and surfaced as a generic
/// internal error so SQL details never leak to clients.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                // unique_violation
                Some("23505") => return ApiError::conflict("A record with these values already exists"),
                // foreign_key_violation
                Some("23503") => return ApiError::conflict("Record is in use and cannot be modified or deleted"),
                _ => {}
            }
        }
        tracing::error!("database error: {}", err);
        ApiError::internal_server_error("An error occurred while processing your request")
    }
}

impl From<crate::database::DbError> for ApiError {
    fn from(err: crate::database::DbError) -> Self {
        match err {
            crate::database::DbError::NotFound(msg) => ApiError::not_found(msg),
            crate::database::DbError::InvalidColumn(msg) => ApiError::bad_request(msg),
            crate::database::DbError::Sqlx(e) => e.into(),
            other => {
                tracing::error!("database error: {}", other);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<crate::filter::FilterError> for ApiError {
    fn from(err: crate::filter::FilterError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = self.to_json();

        match self {
            ApiError::TooManyRequests { retry_after_secs, .. } => (
                status,
                [(header::RETRY_AFTER, retry_after_secs.to_string())],
                Json(body),
            )
                .into_response(),
            _ => (status, Json(body)).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(ApiError::unauthorized("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::too_many_requests("x", 30).status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn json_body_carries_code_and_message() {
        let body = ApiError::forbidden("Insufficient role").to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "FORBIDDEN");
        assert_eq!(body["error"], "Insufficient role");
    }
}
