use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{require_exam_owner, CurrentTeacher};
use crate::api::uploads;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::exam::{ExamCreate, ExamResponse, ExamSummaryResponse, ExamUpdate};
use crate::services::analytics::AnalyticsSummary;
use crate::services::analytics_cache;

pub(in crate::api::exams) async fn list_exams(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<Vec<ExamSummaryResponse>>, ApiError> {
    let rows = repositories::exams::list_by_owner(state.db(), &teacher.sub, None)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;

    Ok(Json(rows.into_iter().map(ExamSummaryResponse::from).collect()))
}

pub(in crate::api::exams) async fn create_exam(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<ExamCreate>,
) -> Result<(StatusCode, Json<ExamResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::Validation(e.to_string()))?;

    let exam = repositories::exams::create(
        state.db(),
        repositories::exams::CreateExam {
            id: &Uuid::new_v4().to_string(),
            title: payload.title.trim(),
            description: payload.description.as_deref(),
            total_marks: payload.total_marks,
            created_by: &teacher.sub,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create exam"))?;

    tracing::info!(exam_id = %exam.id, teacher_id = %teacher.sub, "Exam created");
    Ok((StatusCode::CREATED, Json(ExamResponse::from(exam))))
}

pub(in crate::api::exams) async fn get_exam(
    Path(exam_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = require_exam_owner(&state, &teacher, &exam_id).await?;
    Ok(Json(ExamResponse::from(exam)))
}

pub(in crate::api::exams) async fn update_exam(
    Path(exam_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<ExamUpdate>,
) -> Result<Json<ExamResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::Validation(e.to_string()))?;
    require_exam_owner(&state, &teacher, &exam_id).await?;

    let exam = repositories::exams::update(
        state.db(),
        &exam_id,
        repositories::exams::UpdateExam {
            title: payload.title.map(|title| title.trim().to_string()),
            description: payload.description,
            total_marks: payload.total_marks,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update exam"))?
    .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;

    // Cached summaries carry the exam title.
    analytics_cache::invalidate_exam(&state, &exam.id).await;
    Ok(Json(ExamResponse::from(exam)))
}

pub(in crate::api::exams) async fn delete_exam(
    Path(exam_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    require_exam_owner(&state, &teacher, &exam_id).await?;

    let mut stored_keys: Vec<String> = repositories::submissions::list_by_exam(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exam submissions"))?
        .into_iter()
        .filter_map(|submission| submission.script_storage_key)
        .collect();
    if let Some(rubric) = repositories::rubrics::find_by_exam(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch rubric"))?
    {
        stored_keys.extend(rubric.storage_key);
    }

    let deleted = repositories::exams::delete_by_id(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete exam"))?;
    if !deleted {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    }

    analytics_cache::invalidate_exam(&state, &exam_id).await;
    uploads::discard(&state, stored_keys).await;
    tracing::info!(exam_id = %exam_id, "Exam deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub(in crate::api::exams) async fn exam_analytics(
    Path(exam_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<AnalyticsSummary>, ApiError> {
    require_exam_owner(&state, &teacher, &exam_id).await?;

    let summary = analytics_cache::exam_summary(&state, &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to compute exam analytics"))?;

    Ok(Json(summary))
}
