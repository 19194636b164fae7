use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::ai_grading::GradingError;
use crate::services::grading::GradeFlowError;
use crate::services::ocr::OcrError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    code: &'static str,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    AuthenticationRequired,
    InvalidSession(&'static str),
    Forbidden(&'static str),
    Validation(String),
    NotFound(String),
    Conflict(String),
    TooManyRequests(&'static str),
    Upstream(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    pub(crate) fn status(&self) -> StatusCode {
        match self {
            Self::AuthenticationRequired | Self::InvalidSession(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn code(&self) -> &'static str {
        match self {
            Self::AuthenticationRequired => "authentication_required",
            Self::InvalidSession(_) => "invalid_session",
            Self::Forbidden(_) => "forbidden",
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::TooManyRequests(_) => "rate_limited",
            Self::Upstream(_) => "upstream_error",
            Self::Internal(_) => "internal_error",
        }
    }

    pub(crate) fn detail(self) -> String {
        match self {
            Self::AuthenticationRequired => "Authentication required".to_string(),
            Self::InvalidSession(message)
            | Self::Forbidden(message)
            | Self::TooManyRequests(message) => message.to_string(),
            Self::Validation(message)
            | Self::NotFound(message)
            | Self::Conflict(message)
            | Self::Upstream(message)
            | Self::Internal(message) => message,
        }
    }
}

impl From<OcrError> for ApiError {
    fn from(err: OcrError) -> Self {
        Self::Upstream(err.to_string())
    }
}

impl From<GradingError> for ApiError {
    fn from(err: GradingError) -> Self {
        Self::Upstream(err.to_string())
    }
}

impl From<GradeFlowError> for ApiError {
    fn from(err: GradeFlowError) -> Self {
        match err {
            GradeFlowError::MissingRubric => {
                Self::Validation("Upload a rubric for this exam before grading".to_string())
            }
            GradeFlowError::SubmissionGone => Self::NotFound("Submission not found".to_string()),
            GradeFlowError::InProgress => {
                Self::Conflict("Submission is already being graded, try again shortly".to_string())
            }
            GradeFlowError::Grading(err) => Self::from(err),
            GradeFlowError::Database(err) => Self::internal(err, "Failed to store grade"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let challenge = status == StatusCode::UNAUTHORIZED;

        match &self {
            Self::Upstream(message) => tracing::warn!(error = %message, "Upstream service failed"),
            Self::Internal(message) => tracing::error!(error = %message, "Internal server error"),
            _ => {}
        }

        let body = ErrorResponse { status: status.as_u16(), code, detail: self.detail() };
        let mut response = (status, Json(body)).into_response();
        if challenge {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::ApiError;
    use crate::services::ocr::OcrError;
    use axum::body::to_bytes;
    use axum::http::{header, StatusCode};
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn upstream_errors_keep_the_upstream_message() {
        let err: ApiError =
            OcrError::Upstream { status: 422, message: "unsupported file".to_string() }.into();
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["code"], "upstream_error");
        assert!(json["detail"].as_str().unwrap_or_default().contains("unsupported file"));
    }

    #[test]
    fn unauthorized_responses_carry_challenge() {
        let response = ApiError::InvalidSession("Session expired").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[test]
    fn codes_match_statuses() {
        assert_eq!(ApiError::Validation("x".into()).code(), "validation_error");
        assert_eq!(ApiError::TooManyRequests("x").status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
    }
}
