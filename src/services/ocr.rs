use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

use crate::core::config::Settings;
use crate::core::metrics;

#[derive(Debug, Error)]
pub(crate) enum OcrError {
    #[error("OCR service is not configured")]
    NotConfigured,
    #[error("OCR request failed: {0}")]
    Transport(String),
    #[error("OCR service returned status {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("OCR job {request_id} failed: {message}")]
    JobFailed { request_id: String, message: String },
    #[error("OCR polling timed out for request {request_id} after {attempts} attempts")]
    PollTimeout { request_id: String, attempts: u32 },
    #[error("OCR service returned an unusable response: {0}")]
    InvalidResponse(String),
}

/// Bytes of one uploaded document, already validated.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OcrInput<'a> {
    pub(crate) file_name: &'a str,
    pub(crate) content_type: &'a str,
    pub(crate) bytes: &'a [u8],
}

#[async_trait]
pub(crate) trait TextExtractor: Send + Sync {
    async fn extract_text(&self, input: OcrInput<'_>) -> Result<String, OcrError>;
}

/// DataLab marker client: submit the document, then poll `request_check_url`.
#[derive(Debug, Clone)]
pub(crate) struct MarkerOcrService {
    client: Client,
    api_key: String,
    base_url: String,
    backup_base_url: Option<String>,
    mode: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
    max_submit_retries: u32,
}

#[derive(Debug, Clone)]
struct MarkerJobRef {
    request_id: String,
    request_check_url: String,
}

impl MarkerOcrService {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let ocr = settings.ocr();
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .timeout(Duration::from_secs(ocr.timeout_seconds))
            .build()
            .context("Failed to build OCR HTTP client")?;

        Ok(Self {
            client,
            api_key: ocr.api_key.clone(),
            base_url: ocr.base_url.trim_end_matches('/').to_string(),
            backup_base_url: ocr
                .backup_base_url
                .as_deref()
                .map(|url| url.trim_end_matches('/').to_string()),
            mode: ocr.mode.clone(),
            poll_interval: Duration::from_secs(ocr.poll_interval_seconds),
            max_poll_attempts: ocr.max_poll_attempts,
            max_submit_retries: ocr.max_submit_retries,
        })
    }

    async fn run(&self, base_url: &str, input: OcrInput<'_>) -> Result<String, OcrError> {
        let job_ref = self.submit(base_url, input).await?;
        self.poll(&job_ref).await
    }

    async fn submit(&self, base_url: &str, input: OcrInput<'_>) -> Result<MarkerJobRef, OcrError> {
        let endpoint = format!("{base_url}/marker");
        let mut last_error = None;

        for attempt in 0..=self.max_submit_retries {
            let part = Part::bytes(input.bytes.to_vec())
                .file_name(input.file_name.to_string())
                .mime_str(input.content_type)
                .map_err(|err| OcrError::Transport(err.to_string()))?;
            let form = Form::new()
                .part("file", part)
                .text("mode", self.mode.clone())
                .text("output_format", "markdown");

            let response = self
                .client
                .post(&endpoint)
                .header("X-Api-Key", &self.api_key)
                .multipart(form)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    let parsed = read_json(resp).await?;

                    if !status.is_success() {
                        last_error = Some(OcrError::Upstream {
                            status: status.as_u16(),
                            message: extract_error_message(&parsed),
                        });
                        // Client errors will not get better on retry.
                        if status.is_client_error() {
                            break;
                        }
                    } else if parsed.get("success").and_then(Value::as_bool) == Some(false) {
                        last_error = Some(OcrError::Upstream {
                            status: status.as_u16(),
                            message: extract_error_message(&parsed),
                        });
                    } else if let Some(job_ref) = extract_marker_job_ref(base_url, &parsed) {
                        return Ok(job_ref);
                    } else {
                        last_error = Some(OcrError::InvalidResponse(
                            "submit response missing request reference".to_string(),
                        ));
                    }
                }
                Err(err) => last_error = Some(OcrError::Transport(err.to_string())),
            }

            if attempt < self.max_submit_retries {
                tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt))).await;
            }
        }

        Err(last_error.unwrap_or_else(|| OcrError::Transport("unknown submit error".to_string())))
    }

    async fn poll(&self, job_ref: &MarkerJobRef) -> Result<String, OcrError> {
        for attempt in 0..self.max_poll_attempts {
            let response = self
                .client
                .get(&job_ref.request_check_url)
                .header("X-Api-Key", &self.api_key)
                .send()
                .await
                .map_err(|err| OcrError::Transport(err.to_string()))?;

            let status_code = response.status();
            let parsed = read_json(response).await?;

            if !status_code.is_success() {
                return Err(OcrError::Upstream {
                    status: status_code.as_u16(),
                    message: extract_error_message(&parsed),
                });
            }

            let status = parsed
                .get("status")
                .and_then(Value::as_str)
                .map(str::to_ascii_lowercase)
                .unwrap_or_default();

            match status.as_str() {
                "complete" | "completed" => {
                    return extract_markdown(&parsed).ok_or_else(|| {
                        OcrError::InvalidResponse("completed job has no markdown".to_string())
                    });
                }
                "failed" | "error" => {
                    return Err(OcrError::JobFailed {
                        request_id: job_ref.request_id.clone(),
                        message: extract_error_message(&parsed),
                    });
                }
                _ => {}
            }

            if parsed.get("success").and_then(Value::as_bool) == Some(false) {
                return Err(OcrError::JobFailed {
                    request_id: job_ref.request_id.clone(),
                    message: extract_error_message(&parsed),
                });
            }

            if attempt + 1 < self.max_poll_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        Err(OcrError::PollTimeout {
            request_id: job_ref.request_id.clone(),
            attempts: self.max_poll_attempts,
        })
    }
}

#[async_trait]
impl TextExtractor for MarkerOcrService {
    async fn extract_text(&self, input: OcrInput<'_>) -> Result<String, OcrError> {
        if self.api_key.is_empty() {
            return Err(OcrError::NotConfigured);
        }

        let timer = Instant::now();
        let mut result = self.run(&self.base_url, input).await;

        if let Some(backup) = self.backup_base_url.as_deref() {
            if matches!(result, Err(OcrError::Transport(_))) {
                tracing::warn!(backup = %backup, "Primary OCR endpoint unreachable, trying backup");
                result = self.run(backup, input).await;
            }
        }

        let elapsed = timer.elapsed().as_secs_f64();
        match &result {
            Ok(text) => {
                metrics::record_ocr("success", elapsed);
                tracing::info!(
                    file_name = %input.file_name,
                    chars = text.len(),
                    duration_seconds = elapsed,
                    "OCR completed"
                );
            }
            Err(err) => {
                metrics::record_ocr("error", elapsed);
                tracing::warn!(file_name = %input.file_name, error = %err, "OCR failed");
            }
        }

        result
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, OcrError> {
    let status = response.status();
    let raw_body = response.text().await.map_err(|err| OcrError::Transport(err.to_string()))?;
    serde_json::from_str(&raw_body).map_err(|err| {
        OcrError::InvalidResponse(format!("non-JSON body (status {status}): {err}"))
    })
}

fn extract_marker_job_ref(base_url: &str, payload: &Value) -> Option<MarkerJobRef> {
    let request_check_url = extract_request_check_url(base_url, payload);
    let request_id = payload
        .get("request_id")
        .or_else(|| payload.get("request_check_id"))
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .or_else(|| {
            request_check_url.as_deref().and_then(|url| {
                url.trim_end_matches('/').rsplit('/').next().map(ToString::to_string)
            })
        })?;

    let request_check_url =
        request_check_url.unwrap_or_else(|| format!("{base_url}/marker/{request_id}"));

    Some(MarkerJobRef { request_id, request_check_url })
}

fn extract_request_check_url(base_url: &str, payload: &Value) -> Option<String> {
    let raw = payload.get("request_check_url").and_then(Value::as_str)?;
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Some(raw.to_string());
    }
    reqwest::Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
        .ok()
        .and_then(|base| base.join(raw).ok())
        .map(|url| url.to_string())
}

fn extract_markdown(payload: &Value) -> Option<String> {
    payload
        .get("result")
        .and_then(|result| result.get("markdown"))
        .or_else(|| payload.get("markdown"))
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

fn extract_error_message(payload: &Value) -> String {
    if let Some(detail) = payload.get("detail") {
        if let Some(text) = detail.as_str() {
            return text.to_string();
        }
        if let Some(items) = detail.as_array() {
            let joined = items
                .iter()
                .filter_map(|item| {
                    item.get("msg")
                        .and_then(Value::as_str)
                        .or_else(|| item.get("message").and_then(Value::as_str))
                })
                .collect::<Vec<_>>()
                .join("; ");
            if !joined.is_empty() {
                return joined;
            }
        }
    }

    payload
        .get("error")
        .and_then(Value::as_str)
        .or_else(|| payload.get("message").and_then(Value::as_str))
        .unwrap_or("unknown_error")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn job_ref_resolves_relative_check_url() {
        let job = extract_marker_job_ref(
            "https://ocr.example/api/v1",
            &json!({"request_id": "abc", "request_check_url": "marker/abc"}),
        )
        .expect("job ref");
        assert_eq!(job.request_id, "abc");
        assert_eq!(job.request_check_url, "https://ocr.example/api/v1/marker/abc");
    }

    #[test]
    fn job_ref_derives_id_from_check_url() {
        let job = extract_marker_job_ref(
            "https://ocr.example/api/v1",
            &json!({"request_check_url": "https://ocr.example/api/v1/marker/xyz"}),
        )
        .expect("job ref");
        assert_eq!(job.request_id, "xyz");
    }

    #[test]
    fn job_ref_missing_everything_is_none() {
        assert!(extract_marker_job_ref("https://ocr.example", &json!({"success": true})).is_none());
    }

    #[test]
    fn markdown_is_read_from_result_or_top_level() {
        assert_eq!(
            extract_markdown(&json!({"result": {"markdown": "# Q1"}})).as_deref(),
            Some("# Q1")
        );
        assert_eq!(extract_markdown(&json!({"markdown": "text"})).as_deref(), Some("text"));
        assert_eq!(extract_markdown(&json!({"status": "complete"})), None);
    }

    #[test]
    fn error_message_joins_validation_details() {
        let payload = json!({"detail": [{"msg": "file too large"}, {"message": "bad mode"}]});
        assert_eq!(extract_error_message(&payload), "file too large; bad mode");
        assert_eq!(extract_error_message(&json!({"error": "quota"})), "quota");
        assert_eq!(extract_error_message(&json!({})), "unknown_error");
    }
}
