use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{require_exam_owner, require_submission_owner, CurrentTeacher};
use crate::api::uploads;
use crate::api::validation::{parse_strictness, validate_student_id};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::submission::{
    GradeSubmissionRequest, SubmissionListQuery, SubmissionResponse, SubmissionViewQuery,
};
use crate::services::analytics_cache;
use crate::services::grading::{self, GradeFlowError, GradeMode};
use crate::services::storage;

use super::helpers::to_response;

pub(super) async fn list_submissions(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Query(params): Query<SubmissionListQuery>,
) -> Result<Json<Vec<SubmissionResponse>>, ApiError> {
    let exam = require_exam_owner(&state, &teacher, &params.exam_id).await?;

    let submissions = repositories::submissions::list_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    let mut response = Vec::with_capacity(submissions.len());
    for submission in submissions {
        response.push(to_response(&state, submission).await);
    }
    Ok(Json(response))
}

pub(super) async fn create_submission(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    let mut form = uploads::read_form(multipart, state.settings(), &["script"], 1).await?;

    let exam_id = form
        .text("exam_id")
        .ok_or_else(|| ApiError::Validation("exam_id is required".to_string()))?
        .to_string();
    let student_name = form
        .text("student_name")
        .ok_or_else(|| ApiError::Validation("student_name is required".to_string()))?
        .to_string();
    let student_id = form.text("student_id").map(ToString::to_string);
    if let Some(student_id) = student_id.as_deref() {
        validate_student_id(student_id)?;
    }
    let strictness = parse_strictness(form.text("strictness_level"), state.settings())?;
    let script = form.require_file("script")?;

    let exam = require_exam_owner(&state, &teacher, &exam_id).await?;

    let extracted_text = uploads::extract_text(&state, &script, "ocr_script").await?;

    let submission_id = Uuid::new_v4().to_string();
    let storage_key = uploads::store(
        &state,
        storage::script_key(&exam.id, &submission_id, &script.file_name),
        &script,
    )
    .await?;

    let created = repositories::submissions::create(
        state.db(),
        repositories::submissions::CreateSubmission {
            id: &submission_id,
            exam_id: &exam.id,
            student_name: &student_name,
            student_id: student_id.as_deref(),
            script_file_name: &script.file_name,
            script_file_type: script.content_type(),
            script_file_size: script.size(),
            script_storage_key: storage_key.as_deref(),
            extracted_text: &extracted_text,
            total_points: exam.total_marks,
            strictness_level: i16::from(strictness),
            created_by: &teacher.sub,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create submission"));
    let submission = uploads::discard_on_error(&state, storage_key, created).await?;

    analytics_cache::invalidate_exam(&state, &exam.id).await;
    tracing::info!(
        submission_id = %submission.id,
        exam_id = %exam.id,
        chars = extracted_text.len(),
        "Submission created"
    );

    Ok((StatusCode::CREATED, Json(to_response(&state, submission).await)))
}

/// Returns the submission, grading it first when it has no score yet.
pub(super) async fn view_submission(
    Path(submission_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Query(params): Query<SubmissionViewQuery>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let (submission, _exam) = require_submission_owner(&state, &teacher, &submission_id).await?;

    let submission = if params.auto_grade.unwrap_or(true) && !submission.is_graded() {
        match grading::grade_submission(&state, submission.clone(), None, GradeMode::IfUngraded)
            .await
        {
            Ok(flow) => flow.into_submission(),
            Err(GradeFlowError::MissingRubric) => {
                tracing::info!(submission_id = %submission.id, "No rubric yet, returning ungraded");
                submission
            }
            Err(err) => return Err(err.into()),
        }
    } else {
        submission
    };

    Ok(Json(to_response(&state, submission).await))
}

pub(super) async fn grade_submission(
    Path(submission_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    payload: Option<Json<GradeSubmissionRequest>>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let (submission, _exam) = require_submission_owner(&state, &teacher, &submission_id).await?;
    let strictness = payload.and_then(|Json(body)| body.strictness_level);

    let submission =
        grading::grade_submission(&state, submission, strictness, GradeMode::Regrade)
            .await?
            .into_submission();

    Ok(Json(to_response(&state, submission).await))
}

pub(super) async fn delete_submission(
    Path(submission_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let (submission, _exam) = require_submission_owner(&state, &teacher, &submission_id).await?;

    let stored_key = repositories::submissions::delete_by_id(state.db(), &submission.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete submission"))?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    analytics_cache::invalidate_exam(&state, &submission.exam_id).await;
    uploads::discard(&state, stored_key).await;
    tracing::info!(submission_id = %submission.id, "Submission deleted");

    Ok(StatusCode::NO_CONTENT)
}
