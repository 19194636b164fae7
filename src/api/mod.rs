pub(crate) mod analytics;
pub(crate) mod auth;
pub(crate) mod errors;
pub(crate) mod exams;
pub(crate) mod grading;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod ocr;
pub(crate) mod pages;
pub(crate) mod router;
pub(crate) mod student;
pub(crate) mod submissions;
pub(crate) mod uploads;
pub(crate) mod validation;
