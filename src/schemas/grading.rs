use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::types::StrictnessLevel;
use crate::services::ai_grading::GradeOutcome;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GradeTextRequest {
    #[serde(alias = "answerText", alias = "answer")]
    #[validate(length(min = 1, message = "answer_text must not be empty"))]
    pub(crate) answer_text: String,
    #[serde(alias = "rubricText", alias = "rubric")]
    #[validate(length(min = 1, message = "rubric_text must not be empty"))]
    pub(crate) rubric_text: String,
    #[serde(default, alias = "strictnessLevel")]
    pub(crate) strictness_level: Option<StrictnessLevel>,
    #[serde(default, alias = "totalPoints")]
    #[validate(range(exclusive_min = 0.0, message = "total_points must be positive"))]
    pub(crate) total_points: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GradeResponse {
    pub(crate) score: f64,
    pub(crate) total_points: f64,
    pub(crate) feedback: String,
    pub(crate) grading_standard: String,
}

impl From<GradeOutcome> for GradeResponse {
    fn from(outcome: GradeOutcome) -> Self {
        Self {
            score: outcome.score,
            total_points: outcome.total_points,
            feedback: outcome.feedback,
            grading_standard: outcome.grading_standard,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchItemResponse {
    pub(crate) script_file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) result: Option<GradeResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchResponse {
    pub(crate) rubric_file_name: String,
    pub(crate) results: Vec<BatchItemResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExtractTextResponse {
    pub(crate) file_name: String,
    pub(crate) text: String,
}
