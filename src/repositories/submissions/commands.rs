use sqlx::PgPool;

use crate::db::models::Submission;

use super::types::{CreateSubmission, GradeUpdate, COLUMNS};

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateSubmission<'_>,
) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "INSERT INTO submissions (
            id, exam_id, student_name, student_id, script_file_name, script_file_type,
            script_file_size, script_storage_key, extracted_text, total_points,
            strictness_level, created_by, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$13)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.student_name)
    .bind(params.student_id)
    .bind(params.script_file_name)
    .bind(params.script_file_type)
    .bind(params.script_file_size)
    .bind(params.script_storage_key)
    .bind(params.extracted_text)
    .bind(params.total_points)
    .bind(params.strictness_level)
    .bind(params.created_by)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

/// Persists a grade only while the submission is still ungraded. `None` means
/// another request graded it first.
pub(crate) async fn record_grade_if_ungraded(
    pool: &PgPool,
    id: &str,
    update: GradeUpdate<'_>,
) -> Result<Option<Submission>, sqlx::Error> {
    write_grade(pool, id, update, true).await
}

pub(crate) async fn record_grade(
    pool: &PgPool,
    id: &str,
    update: GradeUpdate<'_>,
) -> Result<Option<Submission>, sqlx::Error> {
    write_grade(pool, id, update, false).await
}

async fn write_grade(
    pool: &PgPool,
    id: &str,
    update: GradeUpdate<'_>,
    only_ungraded: bool,
) -> Result<Option<Submission>, sqlx::Error> {
    let guard = if only_ungraded { " AND score IS NULL" } else { "" };

    sqlx::query_as::<_, Submission>(&format!(
        "UPDATE submissions
         SET score = $1,
             total_points = $2,
             feedback = $3,
             strictness_level = $4,
             grading_standard = $5,
             graded_at = $6,
             updated_at = $6
         WHERE id = $7{guard}
         RETURNING {COLUMNS}",
    ))
    .bind(update.score)
    .bind(update.total_points)
    .bind(update.feedback)
    .bind(update.strictness_level)
    .bind(update.grading_standard)
    .bind(update.graded_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Returns the stored script key of the deleted row, `None` if nothing was deleted.
pub(crate) async fn delete_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<Option<String>>, sqlx::Error> {
    sqlx::query_scalar::<_, Option<String>>(
        "DELETE FROM submissions WHERE id = $1 RETURNING script_storage_key",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}
