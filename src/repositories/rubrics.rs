use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Rubric;

const COLUMNS: &str = "\
    id, exam_id, file_name, file_type, file_size, content, storage_key, uploaded_by, \
    created_at, updated_at";

pub(crate) async fn find_by_exam(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Option<Rubric>, sqlx::Error> {
    sqlx::query_as::<_, Rubric>(&format!("SELECT {COLUMNS} FROM rubrics WHERE exam_id = $1"))
        .bind(exam_id)
        .fetch_optional(pool)
        .await
}

pub(crate) struct UpsertRubric<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) file_name: &'a str,
    pub(crate) file_type: &'a str,
    pub(crate) file_size: i64,
    pub(crate) content: &'a str,
    pub(crate) storage_key: Option<&'a str>,
    pub(crate) uploaded_by: &'a str,
    pub(crate) now: PrimitiveDateTime,
}

/// Last write wins. The row id and `created_at` of the first upload are kept.
pub(crate) async fn upsert(pool: &PgPool, params: UpsertRubric<'_>) -> Result<Rubric, sqlx::Error> {
    sqlx::query_as::<_, Rubric>(&format!(
        "INSERT INTO rubrics (
            id, exam_id, file_name, file_type, file_size, content, storage_key, uploaded_by,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$9)
        ON CONFLICT (exam_id) DO UPDATE SET
            file_name = EXCLUDED.file_name,
            file_type = EXCLUDED.file_type,
            file_size = EXCLUDED.file_size,
            content = EXCLUDED.content,
            storage_key = EXCLUDED.storage_key,
            uploaded_by = EXCLUDED.uploaded_by,
            updated_at = EXCLUDED.updated_at
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.file_name)
    .bind(params.file_type)
    .bind(params.file_size)
    .bind(params.content)
    .bind(params.storage_key)
    .bind(params.uploaded_by)
    .bind(params.now)
    .fetch_one(pool)
    .await
}
