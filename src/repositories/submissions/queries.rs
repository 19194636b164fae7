use sqlx::{PgPool, Postgres, QueryBuilder};
use time::{Date, PrimitiveDateTime};

use crate::db::models::Submission;

use super::types::{ScoredFilter, ScoredRow, StudentSubmissionRow, COLUMNS};

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!("SELECT {COLUMNS} FROM submissions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_by_exam(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions WHERE exam_id = $1 ORDER BY created_at DESC, id"
    ))
    .bind(exam_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_scored(
    pool: &PgPool,
    filter: ScoredFilter<'_>,
) -> Result<Vec<ScoredRow>, sqlx::Error> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT s.exam_id, e.title AS exam_title, s.student_id, s.student_name, s.score, \
         s.total_points, s.created_at \
         FROM submissions s JOIN exams e ON e.id = s.exam_id WHERE TRUE",
    );

    if let Some(owner_id) = filter.owner_id {
        builder.push(" AND e.created_by = ").push_bind(owner_id);
    }
    if let Some(exam_id) = filter.exam_id {
        builder.push(" AND s.exam_id = ").push_bind(exam_id);
    }
    if let Some(student_id) = filter.student_id {
        builder.push(" AND s.student_id = ").push_bind(student_id);
    }
    builder.push(" ORDER BY s.created_at, s.id");

    builder.build_query_as::<ScoredRow>().fetch_all(pool).await
}

pub(crate) async fn list_for_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<StudentSubmissionRow>, sqlx::Error> {
    sqlx::query_as::<_, StudentSubmissionRow>(
        "SELECT s.id, s.exam_id, e.title AS exam_title, e.description AS exam_description,
                s.script_file_name, s.score, s.total_points, s.feedback, s.grading_standard,
                s.graded_at, s.created_at
         FROM submissions s
         JOIN exams e ON e.id = s.exam_id
         WHERE s.student_id = $1
         ORDER BY s.created_at DESC, s.id",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
}

/// Graded submissions per calendar day (by `graded_at`) since `since`.
pub(crate) async fn graded_per_day(
    pool: &PgPool,
    owner_id: &str,
    since: PrimitiveDateTime,
) -> Result<Vec<(Date, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (Date, i64)>(
        "SELECT s.graded_at::date AS day, COUNT(*) AS graded
         FROM submissions s
         JOIN exams e ON e.id = s.exam_id
         WHERE e.created_by = $1 AND s.graded_at IS NOT NULL AND s.graded_at >= $2
         GROUP BY day
         ORDER BY day",
    )
    .bind(owner_id)
    .bind(since)
    .fetch_all(pool)
    .await
}
