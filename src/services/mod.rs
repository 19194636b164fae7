pub(crate) mod ai_grading;
pub(crate) mod analytics;
pub(crate) mod analytics_cache;
pub(crate) mod grading;
pub(crate) mod ocr;
pub(crate) mod report;
pub(crate) mod storage;
