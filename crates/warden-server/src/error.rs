//! Mapping of recovery errors onto HTTP responses

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use warden_core::WardenError;

/// JSON error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Stable machine-readable code
    pub error: String,
    pub message: String,
    /// Progress, present only for `not_ready`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<usize>,
}

/// A [`WardenError`] on its way out of a handler
#[derive(Debug)]
pub struct ApiError(pub WardenError);

impl ApiError {
    /// HTTP status for the wrapped error
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            WardenError::Validation { .. } | WardenError::Serialization { .. } => {
                StatusCode::BAD_REQUEST
            }
            WardenError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            WardenError::Forbidden { .. } | WardenError::NotAGuardian { .. } => {
                StatusCode::FORBIDDEN
            }
            WardenError::NotConfigured { .. } | WardenError::SessionNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            WardenError::NotReady { .. }
            | WardenError::SessionClosed { .. }
            | WardenError::HandleTaken { .. } => StatusCode::CONFLICT,
            WardenError::StorageUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            WardenError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        let (submitted_count, threshold) = match &self.0 {
            WardenError::NotReady {
                submitted,
                threshold,
            } => (Some(*submitted), Some(*threshold)),
            _ => (None, None),
        };
        ErrorBody {
            error: self.0.code().to_string(),
            message: self.0.to_string(),
            submitted_count,
            threshold,
        }
    }
}

impl From<WardenError> for ApiError {
    fn from(err: WardenError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(WardenError::validation(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(WardenError::validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self.0, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_keeps_categories_apart() {
        let cases = [
            (WardenError::validation("x"), StatusCode::BAD_REQUEST),
            (WardenError::unauthorized("x"), StatusCode::UNAUTHORIZED),
            (WardenError::forbidden("x"), StatusCode::FORBIDDEN),
            (WardenError::not_a_guardian("g"), StatusCode::FORBIDDEN),
            (WardenError::not_configured("o"), StatusCode::NOT_FOUND),
            (WardenError::session_not_found("r"), StatusCode::NOT_FOUND),
            (WardenError::not_ready(1, 2), StatusCode::CONFLICT),
            (WardenError::session_closed("completed"), StatusCode::CONFLICT),
            (WardenError::handle_taken("h"), StatusCode::CONFLICT),
            (WardenError::storage("down"), StatusCode::SERVICE_UNAVAILABLE),
            (WardenError::serialization("bad"), StatusCode::BAD_REQUEST),
            (WardenError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }

    #[test]
    fn not_ready_body_reports_progress() {
        let body = ApiError(WardenError::not_ready(1, 3)).body();
        assert_eq!(body.error, "not_ready");
        assert_eq!(body.submitted_count, Some(1));
        assert_eq!(body.threshold, Some(3));

        let json = serde_json::to_value(ApiError(WardenError::forbidden("x")).body()).unwrap();
        assert!(json.get("submittedCount").is_none());
    }
}
