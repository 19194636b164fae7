use axum::{extract::State, routing::get, Json, Router};

use crate::api::analytics::{build_report, load_scored, summarize_rows};
use crate::api::errors::ApiError;
use crate::api::guards::CurrentStudent;
use crate::core::security::Claims;
use crate::core::state::AppState;
use crate::repositories;
use crate::repositories::submissions::ScoredFilter;
use crate::schemas::analytics::{StudentAnalyticsResponse, StudentIdentity, StudentReportResponse};
use crate::schemas::submission::StudentSubmissionResponse;
use crate::services::analytics::AnalyticsSummary;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/submissions", get(my_submissions))
        .route("/analytics", get(my_analytics))
        .route("/report", get(my_report))
}

async fn my_submissions(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentSubmissionResponse>>, ApiError> {
    let rows = repositories::submissions::list_for_student(state.db(), &student.login)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    Ok(Json(rows.into_iter().map(StudentSubmissionResponse::from).collect()))
}

async fn my_analytics(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<StudentAnalyticsResponse>, ApiError> {
    let (student, summary) = own_summary(&state, &student).await?;
    Ok(Json(StudentAnalyticsResponse { student, summary }))
}

async fn my_report(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<StudentReportResponse>, ApiError> {
    let (student, summary) = own_summary(&state, &student).await?;
    Ok(Json(build_report(student, summary)))
}

async fn own_summary(
    state: &AppState,
    claims: &Claims,
) -> Result<(StudentIdentity, AnalyticsSummary), ApiError> {
    let rows = load_scored(
        state,
        ScoredFilter { student_id: Some(&claims.login), ..ScoredFilter::default() },
    )
    .await?;

    let identity = StudentIdentity { student_id: claims.login.clone(), name: claims.name.clone() };
    Ok((identity, summarize_rows(state, rows)))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    use crate::db::types::UserRole;
    use crate::test_support;

    #[tokio::test]
    async fn student_sees_only_own_submissions() {
        let ctx = test_support::setup_test_context().await;
        let db = ctx.state.db();
        let teacher = test_support::insert_teacher(db, "teacher01", "teacher-pass").await;
        let exam = test_support::insert_exam(db, &teacher.id, "History").await;
        let graded =
            test_support::insert_submission(db, &exam.id, &teacher.id, Some("123456"), Some(7.0))
                .await;
        let pending =
            test_support::insert_submission(db, &exam.id, &teacher.id, Some("123456"), None).await;
        test_support::insert_submission(db, &exam.id, &teacher.id, Some("222222"), Some(3.0)).await;
        let token = test_support::bearer_token(
            "student-row-id",
            UserRole::Student,
            "Grace",
            "123456",
            ctx.state.settings(),
        );

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/student/submissions",
                Some(&token),
                None,
            ))
            .await
            .expect("my submissions");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        let items = body.as_array().expect("submissions");
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| item["exam_title"] == "History"));
        let mut ids: Vec<&str> = items.iter().filter_map(|item| item["id"].as_str()).collect();
        ids.sort_unstable();
        let mut expected = vec![graded.id.as_str(), pending.id.as_str()];
        expected.sort_unstable();
        assert_eq!(ids, expected);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/student/analytics",
                Some(&token),
                None,
            ))
            .await
            .expect("my analytics");
        let body = test_support::read_json(response).await;
        assert_eq!(body["student"]["name"], "Grace");
        assert_eq!(body["total_submissions"], 2);
        assert_eq!(body["graded_submissions"], 1);
        assert_eq!(body["average_percentage"], 70.0);
    }

    #[tokio::test]
    async fn teachers_cannot_use_student_routes() {
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
                Method::GET,
                "/api/student/report",
                Some(&token),
                None,
            ))
            .await
            .expect("report");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
