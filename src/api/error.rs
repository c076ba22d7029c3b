//! Maps [`TownError`] onto the `{success, data?, error?, issues?}` envelope
//! and status codes used by every route handler.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::errors::{AuthError, TownError, ValidationIssue};

pub struct ApiError(pub TownError);

impl From<TownError> for ApiError {
    fn from(err: TownError) -> Self {
        Self(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self(TownError::from(err))
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    issues: Option<Vec<ValidationIssue>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, issues) = match &self.0 {
            TownError::NotFound(_) => (StatusCode::NOT_FOUND, None),
            TownError::Conflict(_) => (StatusCode::CONFLICT, None),
            TownError::Validation(issues) => (StatusCode::BAD_REQUEST, Some(issues.clone())),
            TownError::Auth(AuthError::AudienceMismatch { .. }) => (StatusCode::FORBIDDEN, None),
            TownError::Auth(_) => (StatusCode::UNAUTHORIZED, None),
            TownError::Container(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
            TownError::Database(_) | TownError::Serialization(_) | TownError::Upstream(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        };

        let body = ErrorBody { success: false, error: self.0.to_string(), issues };
        (status, Json(body)).into_response()
    }
}

/// Wraps a successful payload in the `{success: true, data}` envelope.
pub fn ok<T: Serialize>(data: T) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true, "data": data }))
}
