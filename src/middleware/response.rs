use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::filter::Pagination;

/// Wrapper for API responses that adds the success envelope, and the
/// pagination block for list endpoints.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: StatusCode,
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK with the success envelope
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: StatusCode::OK,
            pagination: None,
        }
    }

    /// 201 Created
    pub fn created(data: T) -> Self {
        Self {
            data,
            status_code: StatusCode::CREATED,
            pagination: None,
        }
    }

    /// 200 OK with a pagination block
    pub fn paginated(data: T, pagination: Pagination) -> Self {
        Self {
            data,
            status_code: StatusCode::OK,
            pagination: Some(pagination),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "error": "Failed to serialize response data"
                    })),
                )
                    .into_response();
            }
        };

        let envelope = match self.pagination {
            Some(pagination) => json!({
                "success": true,
                "data": data_value,
                "pagination": pagination,
            }),
            None => json!({
                "success": true,
                "data": data_value,
            }),
        };

        (self.status_code, Json(envelope)).into_response()
    }
}

// Convenience type alias used by every handler
pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
