use axum::{extract::Multipart, extract::State, routing::post, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::api::uploads::{self, UploadedFile};
use crate::api::validation::parse_strictness;
use crate::core::state::AppState;
use crate::db::types::StrictnessLevel;
use crate::schemas::grading::{BatchItemResponse, BatchResponse, ExtractTextResponse, GradeResponse};
use crate::services::ai_grading::{resolve_total_points, GradeOutcome, GradeRequest};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/process", post(process))
        .route("/process-batch", post(process_batch))
        .route("/extract-text", post(extract_text))
}

/// One-shot pipeline: OCR the rubric and the script, then grade the script.
async fn process(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<GradeResponse>, ApiError> {
    let mut form = uploads::read_form(multipart, state.settings(), &["rubric", "script"], 2).await?;
    let rubric = form.require_file("rubric")?;
    let script = form.require_file("script")?;
    let strictness = parse_strictness(form.text("strictness_level"), state.settings())?;

    tracing::info!(teacher_id = %teacher.sub, rubric = %rubric.file_name, script = %script.file_name, "Processing exam script");

    let rubric_text = uploads::extract_text(&state, &rubric, "ocr_rubric").await?;
    let outcome = grade_script(&state, &rubric_text, &script, strictness).await?;

    Ok(Json(GradeResponse::from(outcome)))
}

/// Grades several scripts against one rubric. Per-script failures are reported
/// in place so one unreadable scan does not discard the rest.
async fn process_batch(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<BatchResponse>, ApiError> {
    let max_scripts = state.settings().uploads().max_scripts_per_batch;
    let mut form =
        uploads::read_form(multipart, state.settings(), &["rubric", "script"], max_scripts + 1)
            .await?;
    let rubric = form.require_file("rubric")?;
    let scripts = form.take_files("script");
    if scripts.is_empty() {
        return Err(ApiError::Validation("Missing 'script' file".to_string()));
    }
    if scripts.len() > max_scripts {
        return Err(ApiError::Validation(format!("At most {max_scripts} scripts per batch")));
    }
    let strictness = parse_strictness(form.text("strictness_level"), state.settings())?;

    tracing::info!(teacher_id = %teacher.sub, scripts = scripts.len(), "Processing script batch");

    let rubric_text = uploads::extract_text(&state, &rubric, "ocr_rubric").await?;

    let mut results = Vec::with_capacity(scripts.len());
    for script in &scripts {
        let item = match grade_script(&state, &rubric_text, script, strictness).await {
            Ok(outcome) => BatchItemResponse {
                script_file_name: script.file_name.clone(),
                result: Some(GradeResponse::from(outcome)),
                error: None,
            },
            Err(err) => {
                tracing::warn!(script = %script.file_name, code = err.code(), "Batch item failed");
                BatchItemResponse {
                    script_file_name: script.file_name.clone(),
                    result: None,
                    error: Some(err.detail()),
                }
            }
        };
        results.push(item);
    }

    Ok(Json(BatchResponse { rubric_file_name: rubric.file_name, results }))
}

async fn extract_text(
    CurrentTeacher(_teacher): CurrentTeacher,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ExtractTextResponse>, ApiError> {
    let mut form = uploads::read_form(multipart, state.settings(), &["file"], 1).await?;
    let file = form.require_file("file")?;

    let text = uploads::extract_text(&state, &file, "ocr_file").await?;
    Ok(Json(ExtractTextResponse { file_name: file.file_name, text }))
}

async fn grade_script(
    state: &AppState,
    rubric_text: &str,
    script: &UploadedFile,
    strictness: StrictnessLevel,
) -> Result<GradeOutcome, ApiError> {
    let answer_text = uploads::extract_text(state, script, "ocr_script").await?;
    let total_points = resolve_total_points(
        rubric_text,
        &answer_text,
        state.settings().scoring().default_total_points,
    );

    tracing::info!(stage = "grading", script = %script.file_name, total_points, "Grading script");
    let outcome = state
        .scorer()
        .grade(GradeRequest { answer_text: &answer_text, rubric_text, total_points, strictness })
        .await?;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    use crate::db::types::UserRole;
    use crate::test_support::{self, FormPart, PDF_BYTES, PNG_BYTES};

    fn teacher_token(ctx: &test_support::OfflineContext) -> String {
        test_support::bearer_token(
            "teacher-id",
            UserRole::Teacher,
            "Teacher",
            "teacher01",
            ctx.state.settings(),
        )
    }

    #[tokio::test]
    async fn process_grades_script_against_rubric() {
        let ctx = test_support::setup_offline_context().await;
        let token = teacher_token(&ctx);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::multipart_request(
                Method::POST,
                "/api/ocr/process",
                Some(&token),
                &[
                    FormPart::File {
                        field: "rubric",
                        file_name: "rubric.pdf",
                        content_type: "application/pdf",
                        bytes: PDF_BYTES,
                    },
                    FormPart::File {
                        field: "script",
                        file_name: "script.png",
                        content_type: "image/png",
                        bytes: PNG_BYTES,
                    },
                    FormPart::Text("strictness_level", "3"),
                ],
            ))
            .await
            .expect("process");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        assert_eq!(body["score"], 8.0);
        assert_eq!(body["total_points"], 10.0);
        assert_eq!(body["grading_standard"], "Strict");
        assert_eq!(ctx.ocr.calls(), 2);
        assert_eq!(ctx.scorer.calls(), 1);
    }

    #[tokio::test]
    async fn process_rejects_text_script_before_any_ocr() {
        let ctx = test_support::setup_offline_context().await;
        let token = teacher_token(&ctx);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::multipart_request(
                Method::POST,
                "/api/ocr/process",
                Some(&token),
                &[
                    FormPart::File {
                        field: "rubric",
                        file_name: "rubric.pdf",
                        content_type: "application/pdf",
                        bytes: PDF_BYTES,
                    },
                    FormPart::File {
                        field: "script",
                        file_name: "answers.txt",
                        content_type: "text/plain",
                        bytes: b"plain text answers",
                    },
                ],
            ))
            .await
            .expect("process");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
        assert_eq!(body["code"], "validation_error");
        assert_eq!(ctx.ocr.calls(), 0);
        assert_eq!(ctx.scorer.calls(), 0);
    }

    #[tokio::test]
    async fn process_requires_both_files() {
        let ctx = test_support::setup_offline_context().await;
        let token = teacher_token(&ctx);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::multipart_request(
                Method::POST,
                "/api/ocr/process",
                Some(&token),
                &[FormPart::File {
                    field: "script",
                    file_name: "script.png",
                    content_type: "image/png",
                    bytes: PNG_BYTES,
                }],
            ))
            .await
            .expect("process");
        let body = test_support::read_json(response).await;
        assert_eq!(body["status"], 400);
        assert!(body["detail"].as_str().unwrap_or_default().contains("rubric"));
        assert_eq!(ctx.ocr.calls(), 0);
    }

    #[tokio::test]
    async fn batch_returns_one_result_per_script() {
        let ctx = test_support::setup_offline_context().await;
        let token = teacher_token(&ctx);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::multipart_request(
                Method::POST,
                "/api/ocr/process-batch",
                Some(&token),
                &[
                    FormPart::File {
                        field: "rubric",
                        file_name: "rubric.pdf",
                        content_type: "application/pdf",
                        bytes: PDF_BYTES,
                    },
                    FormPart::File {
                        field: "script",
                        file_name: "first.png",
                        content_type: "image/png",
                        bytes: PNG_BYTES,
                    },
                    FormPart::File {
                        field: "script",
                        file_name: "second.pdf",
                        content_type: "application/pdf",
                        bytes: PDF_BYTES,
                    },
                ],
            ))
            .await
            .expect("batch");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        let results = body["results"].as_array().expect("results");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["script_file_name"], "first.png");
        assert_eq!(results[1]["script_file_name"], "second.pdf");
        assert_eq!(results[1]["result"]["score"], 8.0);
        assert_eq!(ctx.ocr.calls(), 3);
    }

    #[tokio::test]
    async fn students_cannot_use_the_pipeline() {
        let ctx = test_support::setup_offline_context().await;
        let token = test_support::bearer_token(
            "student-id",
            UserRole::Student,
            "Student",
            "123456",
            ctx.state.settings(),
        );

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::multipart_request(
                Method::POST,
                "/api/ocr/extract-text",
                Some(&token),
                &[FormPart::File {
                    field: "file",
                    file_name: "scan.png",
                    content_type: "image/png",
                    bytes: PNG_BYTES,
                }],
            ))
            .await
            .expect("extract");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(ctx.ocr.calls(), 0);
    }
}
