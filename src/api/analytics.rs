use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use time::{Duration, OffsetDateTime, PrimitiveDateTime, Time};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::api::validation::validate_student_id;
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::repositories;
use crate::repositories::submissions::{ScoredFilter, ScoredRow};
use crate::schemas::analytics::{
    DashboardQuery, DashboardResponse, StudentAnalyticsResponse, StudentIdentity,
    StudentReportResponse, DEFAULT_ACTIVITY_DAYS, DEFAULT_TOP_EXAMS, MAX_ACTIVITY_DAYS,
};
use crate::schemas::exam::ExamSummaryResponse;
use crate::services::analytics::{self, AnalyticsSummary, ScoredSubmission};
use crate::services::report::{self, PerformanceBand};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/students/:student_id", get(student_analytics))
        .route("/students/:student_id/report", get(student_report))
}

async fn dashboard(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Query(params): Query<DashboardQuery>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let days = params.days.unwrap_or(DEFAULT_ACTIVITY_DAYS).clamp(1, MAX_ACTIVITY_DAYS);
    let top = params.top.unwrap_or(DEFAULT_TOP_EXAMS);

    let rows = load_scored(
        &state,
        ScoredFilter { owner_id: Some(&teacher.sub), ..ScoredFilter::default() },
    )
    .await?;
    let summary = summarize_rows(&state, rows);

    let today = OffsetDateTime::now_utc().date();
    let first_day = today.checked_sub(Duration::days(i64::from(days) - 1)).unwrap_or(today);
    let counts = repositories::submissions::graded_per_day(
        state.db(),
        &teacher.sub,
        PrimitiveDateTime::new(first_day, Time::MIDNIGHT),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to load grading activity"))?;

    let recent_exams = repositories::exams::list_by_owner(state.db(), &teacher.sub, Some(top as i64))
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list recent exams"))?
        .into_iter()
        .map(ExamSummaryResponse::from)
        .collect();

    let top_exams = summary.exam_performance.iter().take(top).cloned().collect();

    Ok(Json(DashboardResponse {
        grading_activity: analytics::grading_activity(&counts, today, days),
        recent_exams,
        top_exams,
        summary,
    }))
}

async fn student_analytics(
    Path(student_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<StudentAnalyticsResponse>, ApiError> {
    let (student, summary) = teacher_view_of_student(&state, &teacher.sub, &student_id).await?;
    Ok(Json(StudentAnalyticsResponse { student, summary }))
}

async fn student_report(
    Path(student_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<StudentReportResponse>, ApiError> {
    let (student, summary) = teacher_view_of_student(&state, &teacher.sub, &student_id).await?;
    tracing::info!(student_id = %student.student_id, teacher_id = %teacher.sub, "Student report generated");
    Ok(Json(build_report(student, summary)))
}

/// One student's results across the exams this teacher owns.
async fn teacher_view_of_student(
    state: &AppState,
    teacher_id: &str,
    student_id: &str,
) -> Result<(StudentIdentity, AnalyticsSummary), ApiError> {
    validate_student_id(student_id)?;

    let rows = load_scored(
        state,
        ScoredFilter {
            owner_id: Some(teacher_id),
            student_id: Some(student_id),
            ..ScoredFilter::default()
        },
    )
    .await?;

    let registered = repositories::students::find_by_student_id(state.db(), student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?
        .map(|student| student.name);
    // Unregistered students are known only by the name written on their scripts.
    let name = registered
        .or_else(|| rows.last().map(|row| row.student_name.clone()))
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    let student = StudentIdentity { student_id: student_id.to_string(), name };
    Ok((student, summarize_rows(state, rows)))
}

pub(crate) async fn load_scored(
    state: &AppState,
    filter: ScoredFilter<'_>,
) -> Result<Vec<ScoredRow>, ApiError> {
    repositories::submissions::list_scored(state.db(), filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load scored submissions"))
}

pub(crate) fn summarize_rows(state: &AppState, rows: Vec<ScoredRow>) -> AnalyticsSummary {
    let submissions: Vec<ScoredSubmission> = rows.into_iter().map(Into::into).collect();
    analytics::summarize(&submissions, state.scoring_policy())
}

pub(crate) fn build_report(student: StudentIdentity, summary: AnalyticsSummary) -> StudentReportResponse {
    let performance_band = (summary.graded_submissions > 0)
        .then(|| PerformanceBand::from_percentage(summary.average_percentage));

    StudentReportResponse {
        generated_at: format_primitive(primitive_now_utc()),
        performance_band,
        trend_direction: report::trend_direction(&summary),
        narrative: report::narrative(&student.name, &summary),
        student,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    use crate::test_support;

    #[tokio::test]
    async fn dashboard_aggregates_across_exams() {
        let ctx = test_support::setup_test_context().await;
        let db = ctx.state.db();
        let teacher = test_support::insert_teacher(db, "teacher01", "teacher-pass").await;
        let other = test_support::insert_teacher(db, "other01", "teacher-pass").await;
        let first = test_support::insert_exam(db, &teacher.id, "First").await;
        let second = test_support::insert_exam(db, &teacher.id, "Second").await;
        let foreign = test_support::insert_exam(db, &other.id, "Foreign").await;
        for score in [2.0, 5.0] {
            test_support::insert_submission(db, &first.id, &teacher.id, None, Some(score)).await;
        }
        for score in [7.0, 9.0] {
            test_support::insert_submission(db, &second.id, &teacher.id, None, Some(score)).await;
        }
        test_support::insert_submission(db, &second.id, &teacher.id, None, None).await;
        test_support::insert_submission(db, &foreign.id, &other.id, None, Some(1.0)).await;
        let token = test_support::teacher_token(&teacher, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/analytics/dashboard?days=7&top=1",
                Some(&token),
                None,
            ))
            .await
            .expect("dashboard");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        assert_eq!(body["total_submissions"], 5);
        assert_eq!(body["graded_submissions"], 4);
        assert_eq!(body["total_exams"], 2);
        assert_eq!(body["average_score"], 5.75);
        assert_eq!(body["passing_rate"], 50.0);

        let activity = body["grading_activity"].as_array().expect("activity");
        assert_eq!(activity.len(), 7);
        assert_eq!(activity[6]["count"], 4);

        let top = body["top_exams"].as_array().expect("top exams");
        assert_eq!(top.len(), 1);
        assert_eq!(top[0]["exam_name"], "Second");
        assert_eq!(body["recent_exams"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn student_report_uses_script_name_for_unregistered_students() {
        let ctx = test_support::setup_test_context().await;
        let db = ctx.state.db();
        let teacher = test_support::insert_teacher(db, "teacher01", "teacher-pass").await;
        let exam = test_support::insert_exam(db, &teacher.id, "Biology").await;
        test_support::insert_submission(db, &exam.id, &teacher.id, Some("123456"), Some(6.0)).await;
        test_support::insert_submission(db, &exam.id, &teacher.id, Some("123456"), Some(9.0)).await;
        test_support::insert_submission(db, &exam.id, &teacher.id, Some("654321"), Some(1.0)).await;
        let token = test_support::teacher_token(&teacher, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/analytics/students/123456/report",
                Some(&token),
                None,
            ))
            .await
            .expect("report");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        assert_eq!(body["student"]["name"], "Ada Student");
        assert_eq!(body["summary"]["graded_submissions"], 2);
        assert_eq!(body["performance_band"], "good");
        assert_eq!(body["trend_direction"], "improving");
        assert!(body["narrative"].as_str().unwrap_or_default().starts_with("Ada Student"));
    }

    #[tokio::test]
    async fn unknown_student_returns_404() {
        let ctx = test_support::setup_test_context().await;
        let teacher =
            test_support::insert_teacher(ctx.state.db(), "teacher01", "teacher-pass").await;
        let token = test_support::teacher_token(&teacher, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/analytics/students/999999",
                Some(&token),
                None,
            ))
            .await
            .expect("student analytics");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
