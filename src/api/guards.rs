use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use axum::response::Redirect;
use axum_extra::extract::cookie::CookieJar;

use crate::api::errors::ApiError;
use crate::core::security::{self, Claims, SecurityError};
use crate::core::state::AppState;
use crate::db::models::{Exam, Submission};
use crate::db::types::UserRole;
use crate::repositories;

/// Any signed-in identity, teacher or student.
pub(crate) struct CurrentUser(pub(crate) Claims);
pub(crate) struct CurrentTeacher(pub(crate) Claims);
pub(crate) struct CurrentStudent(pub(crate) Claims);

/// Session for server-rendered pages: missing or bad sessions redirect to `/login`.
pub(crate) struct PageSession(pub(crate) Claims);

/// The session token from the auth cookie, falling back to a bearer header.
fn session_token(parts: &Parts, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(cookie_name) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(parts, &state.settings().security().cookie_name)
            .ok_or(ApiError::AuthenticationRequired)?;

        let claims = security::verify_token(&token, state.settings()).map_err(|err| match err {
            SecurityError::JwtExpired => ApiError::InvalidSession("Session expired"),
            _ => ApiError::InvalidSession("Invalid session"),
        })?;

        Ok(CurrentUser(claims))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentTeacher {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(claims) = CurrentUser::from_request_parts(parts, state).await?;

        if claims.role == UserRole::Teacher {
            Ok(CurrentTeacher(claims))
        } else {
            Err(ApiError::Forbidden("Teacher access required"))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentStudent {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(claims) = CurrentUser::from_request_parts(parts, state).await?;

        if claims.role == UserRole::Student {
            Ok(CurrentStudent(claims))
        } else {
            Err(ApiError::Forbidden("Student access required"))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for PageSession {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        CurrentUser::from_request_parts(parts, state)
            .await
            .map(|CurrentUser(claims)| PageSession(claims))
            .map_err(|_| Redirect::temporary("/login"))
    }
}

/// Loads an exam and checks that the signed-in teacher created it.
pub(crate) async fn require_exam_owner(
    state: &AppState,
    teacher: &Claims,
    exam_id: &str,
) -> Result<Exam, ApiError> {
    let exam = repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;

    if exam.created_by != teacher.sub {
        return Err(ApiError::Forbidden("Exam belongs to another teacher"));
    }

    Ok(exam)
}

/// Loads a submission together with its exam, enforcing exam ownership.
pub(crate) async fn require_submission_owner(
    state: &AppState,
    teacher: &Claims,
    submission_id: &str,
) -> Result<(Submission, Exam), ApiError> {
    let submission = repositories::submissions::find_by_id(state.db(), submission_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    let exam = require_exam_owner(state, teacher, &submission.exam_id).await?;
    Ok((submission, exam))
}
