use std::collections::HashMap;

use axum::extract::Multipart;

use crate::api::errors::ApiError;
use crate::api::validation;
use crate::core::config::Settings;
use crate::core::state::AppState;
use crate::services::ocr::OcrInput;

/// One validated file part.
#[derive(Debug)]
pub(crate) struct UploadedFile {
    pub(crate) field: String,
    pub(crate) file_name: String,
    pub(crate) extension: String,
    pub(crate) bytes: Vec<u8>,
}

impl UploadedFile {
    pub(crate) fn content_type(&self) -> &'static str {
        validation::canonical_content_type(&self.extension)
    }

    pub(crate) fn size(&self) -> i64 {
        self.bytes.len() as i64
    }
}

#[derive(Debug, Default)]
pub(crate) struct UploadForm {
    files: Vec<UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    pub(crate) fn take_file(&mut self, field: &str) -> Option<UploadedFile> {
        let index = self.files.iter().position(|file| file.field == field)?;
        Some(self.files.remove(index))
    }

    pub(crate) fn take_files(&mut self, field: &str) -> Vec<UploadedFile> {
        let (taken, rest) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|file| file.field == field);
        self.files = rest;
        taken
    }

    pub(crate) fn require_file(&mut self, field: &str) -> Result<UploadedFile, ApiError> {
        self.take_file(field)
            .ok_or_else(|| ApiError::Validation(format!("Missing '{field}' file")))
    }

    pub(crate) fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str).map(str::trim).filter(|value| !value.is_empty())
    }
}

/// Reads every part of a multipart body. File parts are validated by name and
/// declared type before their bodies are read, then streamed chunk by chunk
/// under the configured size limit and checked for their magic bytes.
pub(crate) async fn read_form(
    mut multipart: Multipart,
    settings: &Settings,
    file_fields: &[&str],
    max_files: usize,
) -> Result<UploadForm, ApiError> {
    let uploads = settings.uploads();
    let max_bytes = uploads.max_upload_bytes();
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();

        if !file_fields.contains(&name.as_str()) {
            let text = field
                .text()
                .await
                .map_err(|_| ApiError::Validation(format!("Invalid value for '{name}'")))?;
            form.fields.insert(name, text);
            continue;
        }

        if form.files.len() >= max_files {
            return Err(ApiError::Validation(format!("At most {max_files} files per request")));
        }

        let file_name = field
            .file_name()
            .map(ToString::to_string)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ApiError::Validation(format!("'{name}' must be a file")))?;
        let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
        let extension = validation::validate_upload_header(
            &file_name,
            &content_type,
            &uploads.allowed_extensions,
        )?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|_| ApiError::Validation("Failed to read file".to_string()))?
        {
            let next_size = bytes.len() as u64 + chunk.len() as u64;
            if next_size > max_bytes {
                return Err(ApiError::Validation(format!(
                    "File size exceeds {}MB limit",
                    uploads.max_upload_size_mb
                )));
            }
            bytes.extend_from_slice(&chunk);
        }
        tracing::debug!(field = %name, file_name = %file_name, bytes = bytes.len(), "Upload received");

        validation::validate_upload_body(&extension, &bytes)?;
        form.files.push(UploadedFile { field: name, file_name, extension, bytes });
    }

    Ok(form)
}

/// Runs OCR on a validated upload, logging the pipeline stage.
pub(crate) async fn extract_text(
    state: &AppState,
    file: &UploadedFile,
    stage: &'static str,
) -> Result<String, ApiError> {
    tracing::info!(stage, file_name = %file.file_name, bytes = file.bytes.len(), "Extracting text");

    let text = state
        .ocr()
        .extract_text(OcrInput {
            file_name: &file.file_name,
            content_type: file.content_type(),
            bytes: &file.bytes,
        })
        .await?;

    tracing::info!(stage, file_name = %file.file_name, chars = text.len(), "Text extracted");
    Ok(text)
}

/// Copies an upload to object storage when a bucket is configured.
pub(crate) async fn store(
    state: &AppState,
    key: String,
    file: &UploadedFile,
) -> Result<Option<String>, ApiError> {
    let Some(storage) = state.storage() else {
        return Ok(None);
    };

    let stored = storage
        .put(&key, file.content_type(), file.bytes.clone())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store uploaded file"))?;

    tracing::debug!(key = %stored.key, sha256 = %stored.sha256, size = stored.size, "Upload stored");
    Ok(Some(stored.key))
}

/// Best-effort removal of stored objects; failures are only logged.
pub(crate) async fn discard(state: &AppState, keys: impl IntoIterator<Item = String>) {
    let Some(storage) = state.storage() else {
        return;
    };

    for key in keys {
        if let Err(err) = storage.delete(&key).await {
            tracing::warn!(key = %key, error = %err, "Failed to delete stored object");
        }
    }
}

/// Drops a freshly stored object when the row that should reference it was not written.
pub(crate) async fn discard_on_error<T>(
    state: &AppState,
    stored_key: Option<String>,
    result: Result<T, ApiError>,
) -> Result<T, ApiError> {
    if result.is_err() {
        discard(state, stored_key).await;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn failed_write_discards_freshly_stored_object() {
        let ctx = test_support::setup_test_context_with_storage().await;
        let key = "scripts/e1/s1/script.png".to_string();

        let failed: Result<(), ApiError> =
            Err(ApiError::internal("duplicate key", "Failed to create submission"));
        let err = discard_on_error(&ctx.state, Some(key.clone()), failed)
            .await
            .expect_err("write error is kept");
        assert_eq!(err.code(), "internal_error");
        assert_eq!(ctx.store.deleted(), vec![key.clone()]);

        let saved = discard_on_error(&ctx.state, Some(key), Ok(7)).await.expect("saved");
        assert_eq!(saved, 7);
        assert_eq!(ctx.store.deleted().len(), 1);
    }
}
