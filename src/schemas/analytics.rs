use serde::{Deserialize, Serialize};

use crate::schemas::exam::ExamSummaryResponse;
use crate::services::analytics::{ActivityPoint, AnalyticsSummary, ExamPerformance};
use crate::services::report::{PerformanceBand, TrendDirection};

pub(crate) const DEFAULT_ACTIVITY_DAYS: u32 = 30;
pub(crate) const MAX_ACTIVITY_DAYS: u32 = 365;
pub(crate) const DEFAULT_TOP_EXAMS: usize = 5;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DashboardQuery {
    #[serde(default)]
    pub(crate) days: Option<u32>,
    #[serde(default)]
    pub(crate) top: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DashboardResponse {
    #[serde(flatten)]
    pub(crate) summary: AnalyticsSummary,
    pub(crate) grading_activity: Vec<ActivityPoint>,
    pub(crate) recent_exams: Vec<ExamSummaryResponse>,
    pub(crate) top_exams: Vec<ExamPerformance>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct StudentIdentity {
    pub(crate) student_id: String,
    pub(crate) name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentAnalyticsResponse {
    pub(crate) student: StudentIdentity,
    #[serde(flatten)]
    pub(crate) summary: AnalyticsSummary,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentReportResponse {
    pub(crate) student: StudentIdentity,
    pub(crate) generated_at: String,
    pub(crate) performance_band: Option<PerformanceBand>,
    pub(crate) trend_direction: Option<TrendDirection>,
    pub(crate) narrative: String,
    pub(crate) summary: AnalyticsSummary,
}
