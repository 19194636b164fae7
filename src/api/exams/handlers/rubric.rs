use axum::extract::{Multipart, Path, State};
use axum::Json;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{require_exam_owner, CurrentTeacher};
use crate::api::uploads;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::exam::RubricResponse;
use crate::services::analytics_cache;
use crate::services::storage;

pub(in crate::api::exams) async fn upload_rubric(
    Path(exam_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<RubricResponse>, ApiError> {
    require_exam_owner(&state, &teacher, &exam_id).await?;

    let mut form = uploads::read_form(multipart, state.settings(), &["file"], 1).await?;
    let file = form.require_file("file")?;

    let content = uploads::extract_text(&state, &file, "ocr_rubric").await?;

    let previous_key = repositories::rubrics::find_by_exam(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch rubric"))?
        .and_then(|rubric| rubric.storage_key);

    let upload_id = Uuid::new_v4().to_string();
    let storage_key =
        uploads::store(&state, storage::rubric_key(&exam_id, &upload_id, &file.file_name), &file)
            .await?;

    let saved = repositories::rubrics::upsert(
        state.db(),
        repositories::rubrics::UpsertRubric {
            id: &upload_id,
            exam_id: &exam_id,
            file_name: &file.file_name,
            file_type: file.content_type(),
            file_size: file.size(),
            content: &content,
            storage_key: storage_key.as_deref(),
            uploaded_by: &teacher.sub,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to save rubric"));
    let rubric = uploads::discard_on_error(&state, storage_key.clone(), saved).await?;

    analytics_cache::invalidate_exam(&state, &exam_id).await;
    if let Some(previous_key) = previous_key.filter(|key| Some(key) != storage_key.as_ref()) {
        uploads::discard(&state, [previous_key]).await;
    }

    tracing::info!(exam_id = %exam_id, rubric_id = %rubric.id, chars = content.len(), "Rubric saved");
    Ok(Json(RubricResponse::from(rubric)))
}

pub(in crate::api::exams) async fn get_rubric(
    Path(exam_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<RubricResponse>, ApiError> {
    require_exam_owner(&state, &teacher, &exam_id).await?;

    let rubric = repositories::rubrics::find_by_exam(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch rubric"))?
        .ok_or_else(|| ApiError::NotFound("Rubric not found".to_string()))?;

    Ok(Json(RubricResponse::from(rubric)))
}
