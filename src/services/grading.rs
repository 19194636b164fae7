use thiserror::Error;
use uuid::Uuid;

use crate::core::redis::LockOutcome;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Submission;
use crate::db::types::StrictnessLevel;
use crate::repositories;
use crate::repositories::submissions::GradeUpdate;

use super::ai_grading::{resolve_total_points, GradeRequest, GradingError};
use super::analytics_cache;

#[derive(Debug, Error)]
pub(crate) enum GradeFlowError {
    #[error("exam has no rubric")]
    MissingRubric,
    #[error("submission not found")]
    SubmissionGone,
    #[error("submission is already being graded")]
    InProgress,
    #[error(transparent)]
    Grading(#[from] GradingError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GradeMode {
    /// Grade only while `score` is still empty; the first stored result wins.
    IfUngraded,
    /// Overwrite any existing grade.
    Regrade,
}

#[derive(Debug)]
pub(crate) enum GradeFlow {
    Graded(Submission),
    /// Already graded, or another request holds the grading lock.
    Unchanged(Submission),
}

impl GradeFlow {
    pub(crate) fn into_submission(self) -> Submission {
        match self {
            Self::Graded(submission) | Self::Unchanged(submission) => submission,
        }
    }
}

pub(crate) fn lock_key(submission_id: &str) -> String {
    format!("grading:submission:{submission_id}")
}

/// Grades a stored submission against its exam's rubric and persists the result.
pub(crate) async fn grade_submission(
    state: &AppState,
    submission: Submission,
    strictness: Option<StrictnessLevel>,
    mode: GradeMode,
) -> Result<GradeFlow, GradeFlowError> {
    if mode == GradeMode::IfUngraded && submission.is_graded() {
        return Ok(GradeFlow::Unchanged(submission));
    }

    let rubric = repositories::rubrics::find_by_exam(state.db(), &submission.exam_id)
        .await?
        .ok_or(GradeFlowError::MissingRubric)?;

    let key = lock_key(&submission.id);
    let token = Uuid::new_v4().to_string();
    let lock_ttl = state.settings().scoring().grading_lock_seconds;
    match state.redis().try_lock(&key, &token, lock_ttl).await {
        Ok(LockOutcome::Held) => {
            tracing::info!(submission_id = %submission.id, "Grading already in progress");
            return match mode {
                GradeMode::IfUngraded => Ok(GradeFlow::Unchanged(submission)),
                GradeMode::Regrade => Err(GradeFlowError::InProgress),
            };
        }
        Ok(LockOutcome::Acquired | LockOutcome::Unavailable) => {}
        Err(err) => {
            tracing::warn!(error = %err, "Grading lock unavailable, relying on conditional update");
        }
    }

    let result = run_locked(state, &submission, &rubric.content, strictness, mode).await;

    if let Err(err) = state.redis().release_lock(&key, &token).await {
        tracing::warn!(submission_id = %submission.id, error = %err, "Failed to release grading lock");
    }

    if matches!(result, Ok(GradeFlow::Graded(_))) {
        analytics_cache::invalidate_exam(state, &submission.exam_id).await;
    }
    result
}

async fn run_locked(
    state: &AppState,
    submission: &Submission,
    rubric_text: &str,
    strictness: Option<StrictnessLevel>,
    mode: GradeMode,
) -> Result<GradeFlow, GradeFlowError> {
    let fallback_points = repositories::exams::find_by_id(state.db(), &submission.exam_id)
        .await?
        .map(|exam| exam.total_marks)
        .unwrap_or(state.settings().scoring().default_total_points);
    let total_points =
        resolve_total_points(rubric_text, &submission.extracted_text, fallback_points);
    let strictness = strictness
        .or_else(|| StrictnessLevel::try_from(submission.strictness_level).ok())
        .unwrap_or_default();

    tracing::info!(
        stage = "grading",
        submission_id = %submission.id,
        exam_id = %submission.exam_id,
        strictness = i16::from(strictness),
        "Grading submission"
    );

    let outcome = state
        .scorer()
        .grade(GradeRequest {
            answer_text: &submission.extracted_text,
            rubric_text,
            total_points,
            strictness,
        })
        .await?;

    let update = GradeUpdate {
        score: outcome.score,
        total_points: outcome.total_points,
        feedback: &outcome.feedback,
        strictness_level: i16::from(strictness),
        grading_standard: &outcome.grading_standard,
        graded_at: primitive_now_utc(),
    };

    let stored = match mode {
        GradeMode::IfUngraded => {
            repositories::submissions::record_grade_if_ungraded(state.db(), &submission.id, update)
                .await?
        }
        GradeMode::Regrade => {
            repositories::submissions::record_grade(state.db(), &submission.id, update).await?
        }
    };

    if let Some(graded) = stored {
        return Ok(GradeFlow::Graded(graded));
    }

    // Lost the race against another grader, or the row was deleted meanwhile.
    repositories::submissions::find_by_id(state.db(), &submission.id)
        .await?
        .map(GradeFlow::Unchanged)
        .ok_or(GradeFlowError::SubmissionGone)
}
