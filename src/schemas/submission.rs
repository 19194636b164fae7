use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::Submission;
use crate::db::types::StrictnessLevel;
use crate::repositories::submissions::StudentSubmissionRow;
use crate::services::analytics::{percentage, round2};

#[derive(Debug, Deserialize)]
pub(crate) struct SubmissionListQuery {
    pub(crate) exam_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SubmissionViewQuery {
    #[serde(default)]
    pub(crate) auto_grade: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GradeSubmissionRequest {
    #[serde(default, alias = "strictnessLevel")]
    pub(crate) strictness_level: Option<StrictnessLevel>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_name: String,
    pub(crate) student_id: Option<String>,
    pub(crate) script_file_name: String,
    pub(crate) script_file_type: String,
    pub(crate) script_file_size: i64,
    pub(crate) script_url: Option<String>,
    pub(crate) extracted_text: String,
    pub(crate) score: Option<f64>,
    pub(crate) total_points: f64,
    pub(crate) percentage: Option<f64>,
    pub(crate) is_graded: bool,
    pub(crate) feedback: Option<String>,
    pub(crate) strictness_level: i16,
    pub(crate) grading_standard: Option<String>,
    pub(crate) graded_at: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl SubmissionResponse {
    pub(crate) fn from_db(submission: Submission, script_url: Option<String>) -> Self {
        let is_graded = submission.is_graded();
        Self {
            percentage: submission
                .score
                .map(|score| round2(percentage(score, submission.total_points))),
            is_graded,
            id: submission.id,
            exam_id: submission.exam_id,
            student_name: submission.student_name,
            student_id: submission.student_id,
            script_file_name: submission.script_file_name,
            script_file_type: submission.script_file_type,
            script_file_size: submission.script_file_size,
            script_url,
            extracted_text: submission.extracted_text,
            score: submission.score,
            total_points: submission.total_points,
            feedback: submission.feedback,
            strictness_level: submission.strictness_level,
            grading_standard: submission.grading_standard,
            graded_at: submission.graded_at.map(format_primitive),
            created_at: format_primitive(submission.created_at),
            updated_at: format_primitive(submission.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentSubmissionResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) exam_title: String,
    pub(crate) exam_description: Option<String>,
    pub(crate) script_file_name: String,
    pub(crate) score: Option<f64>,
    pub(crate) total_points: f64,
    pub(crate) percentage: Option<f64>,
    pub(crate) feedback: Option<String>,
    pub(crate) grading_standard: Option<String>,
    pub(crate) graded_at: Option<String>,
    pub(crate) created_at: String,
}

impl From<StudentSubmissionRow> for StudentSubmissionResponse {
    fn from(row: StudentSubmissionRow) -> Self {
        Self {
            percentage: row.score.map(|score| round2(percentage(score, row.total_points))),
            id: row.id,
            exam_id: row.exam_id,
            exam_title: row.exam_title,
            exam_description: row.exam_description,
            script_file_name: row.script_file_name,
            score: row.score,
            total_points: row.total_points,
            feedback: row.feedback,
            grading_standard: row.grading_standard,
            graded_at: row.graded_at.map(format_primitive),
            created_at: format_primitive(row.created_at),
        }
    }
}
