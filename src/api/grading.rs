use axum::{extract::State, routing::post, Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::api::validation::default_strictness;
use crate::core::state::AppState;
use crate::schemas::grading::{GradeResponse, GradeTextRequest};
use crate::services::ai_grading::{resolve_total_points, GradeRequest};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/grade", post(grade_text))
}

/// Grades already-extracted answer text against rubric text.
async fn grade_text(
    CurrentTeacher(_teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<GradeTextRequest>,
) -> Result<Json<GradeResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::Validation(e.to_string()))?;

    let settings = state.settings();
    let strictness = payload.strictness_level.unwrap_or_else(|| default_strictness(settings));
    let total_points = payload.total_points.unwrap_or_else(|| {
        resolve_total_points(
            &payload.rubric_text,
            &payload.answer_text,
            settings.scoring().default_total_points,
        )
    });

    tracing::info!(stage = "grading", total_points, strictness = i16::from(strictness), "Grading text");
    let outcome = state
        .scorer()
        .grade(GradeRequest {
            answer_text: &payload.answer_text,
            rubric_text: &payload.rubric_text,
            total_points,
            strictness,
        })
        .await?;

    Ok(Json(GradeResponse::from(outcome)))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::db::types::UserRole;
    use crate::test_support;

    #[tokio::test]
    async fn grade_uses_rubric_points_marker() {
        let ctx = test_support::setup_offline_context().await;
        let token = test_support::bearer_token(
            "teacher-id",
            UserRole::Teacher,
            "Teacher",
            "teacher01",
            ctx.state.settings(),
        );

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/grade",
                Some(&token),
                Some(json!({
                    "answer_text": "Photosynthesis converts light to chemical energy.",
                    "rubric_text": "Explain photosynthesis (5 points)",
                })),
            ))
            .await
            .expect("grade");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        assert_eq!(body["total_points"], 5.0);
        assert_eq!(body["score"], 5.0);
        assert_eq!(body["grading_standard"], "Standard");
        assert_eq!(ctx.scorer.calls(), 1);
    }

    #[tokio::test]
    async fn grade_rejects_empty_answer() {
        let ctx = test_support::setup_offline_context().await;
        let token = test_support::bearer_token(
            "teacher-id",
            UserRole::Teacher,
            "Teacher",
            "teacher01",
            ctx.state.settings(),
        );

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/grade",
                Some(&token),
                Some(json!({"answer_text": "", "rubric_text": "Q1"})),
            ))
            .await
            .expect("grade");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ctx.scorer.calls(), 0);
    }

    #[tokio::test]
    async fn grade_requires_session() {
        let ctx = test_support::setup_offline_context().await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/grade",
                None,
                Some(json!({"answer_text": "a", "rubric_text": "b"})),
            ))
            .await
            .expect("grade");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "authentication_required");
    }
}
