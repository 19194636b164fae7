use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;

/// Teacher account. Students live in their own table and log in by student id.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) hashed_password: String,
    pub(crate) full_name: String,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Student {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) name: String,
    pub(crate) email: Option<String>,
    pub(crate) hashed_password: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) total_marks: f64,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Rubric {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) file_name: String,
    pub(crate) file_type: String,
    pub(crate) file_size: i64,
    pub(crate) content: String,
    pub(crate) storage_key: Option<String>,
    pub(crate) uploaded_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Submission {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_name: String,
    pub(crate) student_id: Option<String>,
    pub(crate) script_file_name: String,
    pub(crate) script_file_type: String,
    pub(crate) script_file_size: i64,
    pub(crate) script_storage_key: Option<String>,
    pub(crate) extracted_text: String,
    pub(crate) score: Option<f64>,
    pub(crate) total_points: f64,
    pub(crate) feedback: Option<String>,
    pub(crate) strictness_level: i16,
    pub(crate) grading_standard: Option<String>,
    pub(crate) graded_at: Option<PrimitiveDateTime>,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl Submission {
    pub(crate) fn is_graded(&self) -> bool {
        self.score.is_some()
    }
}
