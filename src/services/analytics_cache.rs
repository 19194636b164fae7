use crate::core::state::AppState;
use crate::repositories;
use crate::repositories::submissions::ScoredFilter;

use super::analytics::{summarize, AnalyticsSummary, ScoredSubmission};

pub(crate) fn exam_key(exam_id: &str) -> String {
    format!("analytics:exam:{exam_id}")
}

/// Drops the cached summary of one exam. Failures are logged: the database stays
/// authoritative and the entry expires on its own.
pub(crate) async fn invalidate_exam(state: &AppState, exam_id: &str) {
    if let Err(err) = state.redis().delete(&[exam_key(exam_id)]).await {
        tracing::warn!(exam_id = %exam_id, error = %err, "Failed to invalidate analytics cache");
    }
}

pub(crate) async fn exam_summary(
    state: &AppState,
    exam_id: &str,
) -> Result<AnalyticsSummary, sqlx::Error> {
    let key = exam_key(exam_id);

    match state.redis().get_string(&key).await {
        Ok(Some(cached)) => match serde_json::from_str::<AnalyticsSummary>(&cached) {
            Ok(summary) => return Ok(summary),
            Err(err) => tracing::warn!(error = %err, "Discarding unreadable analytics cache entry"),
        },
        Ok(None) => {}
        Err(err) => tracing::warn!(error = %err, "Analytics cache read failed"),
    }

    let rows = repositories::submissions::list_scored(
        state.db(),
        ScoredFilter { exam_id: Some(exam_id), ..ScoredFilter::default() },
    )
    .await?;
    let submissions: Vec<ScoredSubmission> = rows.into_iter().map(Into::into).collect();
    let summary = summarize(&submissions, state.scoring_policy());

    match serde_json::to_string(&summary) {
        Ok(encoded) => {
            let ttl = state.settings().scoring().analytics_cache_ttl_seconds;
            if let Err(err) = state.redis().set_string(&key, &encoded, ttl).await {
                tracing::warn!(error = %err, "Analytics cache write failed");
            }
        }
        Err(err) => tracing::warn!(error = %err, "Failed to encode analytics summary"),
    }

    Ok(summary)
}
