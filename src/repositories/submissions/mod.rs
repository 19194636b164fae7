mod commands;
mod queries;
mod types;

pub(crate) use commands::{create, delete_by_id, record_grade, record_grade_if_ungraded};
pub(crate) use queries::{
    find_by_id, graded_per_day, list_by_exam, list_for_student, list_scored,
};
pub(crate) use types::{
    CreateSubmission, GradeUpdate, ScoredFilter, ScoredRow, StudentSubmissionRow,
};
