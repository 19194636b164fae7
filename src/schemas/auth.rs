use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::security::Claims;
use crate::db::types::UserRole;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TeacherRegister {
    #[validate(length(min = 3, max = 64, message = "username must be 3-64 characters"))]
    pub(crate) username: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub(crate) password: String,
    #[serde(alias = "fullName", alias = "name")]
    #[validate(length(min = 1, max = 200, message = "full_name must not be empty"))]
    pub(crate) full_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TeacherLogin {
    pub(crate) username: String,
    pub(crate) password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StudentRegister {
    #[serde(alias = "studentId")]
    pub(crate) student_id: String,
    #[validate(length(min = 1, max = 200, message = "name must not be empty"))]
    pub(crate) name: String,
    #[serde(default)]
    #[validate(email(message = "email is invalid"))]
    pub(crate) email: Option<String>,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub(crate) password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StudentLogin {
    #[serde(alias = "studentId")]
    pub(crate) student_id: String,
    pub(crate) password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct IdentityResponse {
    pub(crate) id: String,
    pub(crate) role: UserRole,
    pub(crate) name: String,
    pub(crate) login: String,
}

impl From<&Claims> for IdentityResponse {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.sub.clone(),
            role: claims.role,
            name: claims.name.clone(),
            login: claims.login.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    pub(crate) access_token: String,
    pub(crate) token_type: String,
    pub(crate) expires_in: i64,
    pub(crate) user: IdentityResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct VerifyResponse {
    pub(crate) authenticated: bool,
    pub(crate) user: IdentityResponse,
}
