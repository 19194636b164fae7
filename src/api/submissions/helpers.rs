use std::time::Duration;

use crate::core::state::AppState;
use crate::db::models::Submission;
use crate::schemas::submission::SubmissionResponse;

const SCRIPT_URL_TTL: Duration = Duration::from_secs(15 * 60);

/// Short-lived download link for the stored script, when there is one.
pub(super) async fn script_url(state: &AppState, submission: &Submission) -> Option<String> {
    let storage = state.storage()?;
    let key = submission.script_storage_key.as_deref()?;

    match storage.presign_get(key, SCRIPT_URL_TTL).await {
        Ok(url) => Some(url),
        Err(err) => {
            tracing::warn!(submission_id = %submission.id, error = %err, "Failed to presign script URL");
            None
        }
    }
}

pub(super) async fn to_response(state: &AppState, submission: Submission) -> SubmissionResponse {
    let url = script_url(state, &submission).await;
    SubmissionResponse::from_db(submission, url)
}
