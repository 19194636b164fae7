mod handlers;
mod helpers;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_submissions).post(handlers::create_submission))
        .route("/:submission_id", get(handlers::view_submission).delete(handlers::delete_submission))
        .route("/:submission_id/grade", post(handlers::grade_submission))
}
