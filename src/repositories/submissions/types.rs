use time::PrimitiveDateTime;

pub(crate) const COLUMNS: &str = "\
    id, exam_id, student_name, student_id, script_file_name, script_file_type, \
    script_file_size, script_storage_key, extracted_text, score, total_points, feedback, \
    strictness_level, grading_standard, graded_at, created_by, created_at, updated_at";

pub(crate) struct CreateSubmission<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) student_name: &'a str,
    pub(crate) student_id: Option<&'a str>,
    pub(crate) script_file_name: &'a str,
    pub(crate) script_file_type: &'a str,
    pub(crate) script_file_size: i64,
    pub(crate) script_storage_key: Option<&'a str>,
    pub(crate) extracted_text: &'a str,
    pub(crate) total_points: f64,
    pub(crate) strictness_level: i16,
    pub(crate) created_by: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) struct GradeUpdate<'a> {
    pub(crate) score: f64,
    pub(crate) total_points: f64,
    pub(crate) feedback: &'a str,
    pub(crate) strictness_level: i16,
    pub(crate) grading_standard: &'a str,
    pub(crate) graded_at: PrimitiveDateTime,
}

/// Narrow projection feeding analytics. Joined with the exam for titles.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ScoredRow {
    pub(crate) exam_id: String,
    pub(crate) exam_title: String,
    pub(crate) student_id: Option<String>,
    pub(crate) student_name: String,
    pub(crate) score: Option<f64>,
    pub(crate) total_points: f64,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ScoredFilter<'a> {
    pub(crate) owner_id: Option<&'a str>,
    pub(crate) exam_id: Option<&'a str>,
    pub(crate) student_id: Option<&'a str>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StudentSubmissionRow {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) exam_title: String,
    pub(crate) exam_description: Option<String>,
    pub(crate) script_file_name: String,
    pub(crate) score: Option<f64>,
    pub(crate) total_points: f64,
    pub(crate) feedback: Option<String>,
    pub(crate) grading_standard: Option<String>,
    pub(crate) graded_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
}
