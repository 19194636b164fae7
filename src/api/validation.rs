use crate::api::errors::ApiError;
use crate::core::config::Settings;
use crate::db::types::StrictnessLevel;
use std::path::Path;

const PDF_MAGIC: &[u8] = b"%PDF";
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

pub(crate) fn validate_student_id(student_id: &str) -> Result<(), ApiError> {
    let valid = student_id.len() == 6 && student_id.chars().all(|c| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(ApiError::Validation("Student ID must be exactly 6 digits".to_string()))
    }
}

pub(crate) fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Checks the name and declared type of an upload. Cheap, so it runs before the
/// body is read.
pub(crate) fn validate_upload_header(
    filename: &str,
    content_type: &str,
    allowed_extensions: &[String],
) -> Result<String, ApiError> {
    let extension = file_extension(filename)
        .ok_or_else(|| ApiError::Validation("File must have an extension".to_string()))?;

    if !allowed_extensions.iter().any(|allowed| allowed == &extension) {
        return Err(ApiError::Validation(format!(
            "File extension '.{extension}' is not allowed; use one of: {}",
            allowed_extensions.join(", ")
        )));
    }

    let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    if !mime_allowed_for_extension(&mime, &extension) {
        return Err(ApiError::Validation(format!(
            "MIME type '{mime}' does not match extension '.{extension}'"
        )));
    }

    Ok(extension)
}

/// Checks that the leading bytes carry the signature the extension promises.
pub(crate) fn validate_upload_body(extension: &str, bytes: &[u8]) -> Result<(), ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::Validation("Uploaded file is empty".to_string()));
    }

    let magic = match extension {
        "pdf" => PDF_MAGIC,
        "png" => PNG_MAGIC,
        "jpg" | "jpeg" => JPEG_MAGIC,
        other => {
            return Err(ApiError::Validation(format!("File extension '.{other}' is not allowed")))
        }
    };

    if bytes.starts_with(magic) {
        Ok(())
    } else {
        Err(ApiError::Validation(format!("File content does not look like a .{extension} file")))
    }
}

/// Strictness from a form field, falling back to the configured default.
pub(crate) fn parse_strictness(
    raw: Option<&str>,
    settings: &Settings,
) -> Result<StrictnessLevel, ApiError> {
    let Some(raw) = raw else {
        return Ok(default_strictness(settings));
    };
    raw.parse::<i16>()
        .ok()
        .and_then(|level| StrictnessLevel::try_from(level).ok())
        .ok_or_else(|| ApiError::Validation("strictness_level must be between 1 and 4".to_string()))
}

pub(crate) fn default_strictness(settings: &Settings) -> StrictnessLevel {
    StrictnessLevel::try_from(settings.scoring().default_strictness).unwrap_or_default()
}

/// Canonical content type sent downstream, independent of what the client declared.
pub(crate) fn canonical_content_type(extension: &str) -> &'static str {
    match extension {
        "pdf" => "application/pdf",
        "png" => "image/png",
        _ => "image/jpeg",
    }
}

fn mime_allowed_for_extension(mime: &str, extension: &str) -> bool {
    match extension {
        "jpg" | "jpeg" => matches!(mime, "image/jpeg" | "image/jpg" | "image/pjpeg"),
        "png" => mime == "image/png",
        "pdf" => matches!(mime, "application/pdf" | "application/x-pdf"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        ["png", "jpg", "jpeg", "pdf"].iter().map(|ext| ext.to_string()).collect()
    }

    #[test]
    fn student_id_must_be_six_digits() {
        assert!(validate_student_id("123456").is_ok());
        assert!(validate_student_id("12345").is_err());
        assert!(validate_student_id("1234567").is_err());
        assert!(validate_student_id("12a456").is_err());
        assert!(validate_student_id("１２３４５６").is_err());
    }

    #[test]
    fn text_files_are_rejected_by_extension() {
        let err = validate_upload_header("answers.txt", "text/plain", &allowed()).unwrap_err();
        assert!(matches!(err, ApiError::Validation(message) if message.contains(".txt")));
    }

    #[test]
    fn declared_type_must_match_extension() {
        assert_eq!(validate_upload_header("a.PNG", "image/png", &allowed()).unwrap(), "png");
        assert!(validate_upload_header("a.png", "application/pdf", &allowed()).is_err());
        assert!(validate_upload_header("scan.pdf", "application/pdf; charset=binary", &allowed())
            .is_ok());
        assert!(validate_upload_header("noext", "image/png", &allowed()).is_err());
    }

    #[test]
    fn magic_bytes_must_match() {
        assert!(validate_upload_body("pdf", b"%PDF-1.7\n...").is_ok());
        assert!(validate_upload_body("jpg", &[0xFF, 0xD8, 0xFF, 0xE0, 0x00]).is_ok());
        assert!(validate_upload_body("png", b"%PDF-1.7").is_err());
        assert!(validate_upload_body("pdf", b"").is_err());
    }
}
