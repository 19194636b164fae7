mod manage;
mod rubric;

pub(super) use manage::{create_exam, delete_exam, exam_analytics, get_exam, list_exams, update_exam};
pub(super) use rubric::{get_rubric, upload_rubric};
