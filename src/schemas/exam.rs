use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Exam, Rubric};
use crate::repositories::exams::ExamSummaryRow;

fn default_total_marks() -> f64 {
    10.0
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamCreate {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default = "default_total_marks", alias = "totalMarks")]
    #[validate(range(exclusive_min = 0.0, message = "total_marks must be positive"))]
    pub(crate) total_marks: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default, alias = "totalMarks")]
    #[validate(range(exclusive_min = 0.0, message = "total_marks must be positive"))]
    pub(crate) total_marks: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) total_marks: f64,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<Exam> for ExamResponse {
    fn from(exam: Exam) -> Self {
        Self {
            id: exam.id,
            title: exam.title,
            description: exam.description,
            total_marks: exam.total_marks,
            created_at: format_primitive(exam.created_at),
            updated_at: format_primitive(exam.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamSummaryResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) total_marks: f64,
    pub(crate) submission_count: i64,
    pub(crate) graded_count: i64,
    pub(crate) has_rubric: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<ExamSummaryRow> for ExamSummaryResponse {
    fn from(row: ExamSummaryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            total_marks: row.total_marks,
            submission_count: row.submission_count,
            graded_count: row.graded_count,
            has_rubric: row.has_rubric,
            created_at: format_primitive(row.created_at),
            updated_at: format_primitive(row.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RubricResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) file_name: String,
    pub(crate) file_type: String,
    pub(crate) file_size: i64,
    pub(crate) content: String,
    pub(crate) has_stored_file: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<Rubric> for RubricResponse {
    fn from(rubric: Rubric) -> Self {
        Self {
            id: rubric.id,
            exam_id: rubric.exam_id,
            file_name: rubric.file_name,
            file_type: rubric.file_type,
            file_size: rubric.file_size,
            content: rubric.content,
            has_stored_file: rubric.storage_key.is_some(),
            created_at: format_primitive(rubric.created_at),
            updated_at: format_primitive(rubric.updated_at),
        }
    }
}
