pub(crate) mod exams;
pub(crate) mod rubrics;
pub(crate) mod students;
pub(crate) mod submissions;
pub(crate) mod users;
