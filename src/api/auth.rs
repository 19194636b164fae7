use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::validate_student_id;
use crate::core::security::{self, TokenSubject};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::auth::{
    IdentityResponse, SessionResponse, StudentLogin, StudentRegister, TeacherLogin,
    TeacherRegister, VerifyResponse,
};

/// Max attempts per window for auth endpoints.
const AUTH_RATE_LIMIT: u64 = 10;
/// Rate limit window in seconds.
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

const BAD_TEACHER_CREDENTIALS: &str = "Incorrect username or password";
const BAD_STUDENT_CREDENTIALS: &str = "Incorrect student ID or password";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register_teacher))
        .route("/login", post(login_teacher))
        .route("/student-register", post(register_student))
        .route("/student-login", post(login_student))
        .route("/logout", post(logout))
        .route("/verify", get(verify))
}

async fn register_teacher(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<TeacherRegister>,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::Validation(e.to_string()))?;
    let username = payload.username.trim();

    enforce_rate_limit(&state, &format!("rl:register:{username}")).await?;

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username,
            hashed_password,
            full_name: payload.full_name.trim(),
            is_active: true,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create user"))?
    .ok_or_else(|| ApiError::Conflict("Username is already taken".to_string()))?;

    tracing::info!(user_id = %user.id, "Teacher registered");

    let subject = TokenSubject {
        id: &user.id,
        role: UserRole::Teacher,
        name: &user.full_name,
        login: &user.username,
    };
    let (jar, body) = issue_session(&state, jar, subject)?;
    Ok((StatusCode::CREATED, jar, body))
}

async fn login_teacher(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<TeacherLogin>,
) -> Result<(CookieJar, Json<SessionResponse>), ApiError> {
    let username = payload.username.trim();
    enforce_rate_limit(&state, &format!("rl:login:teacher:{username}")).await?;

    let user = repositories::users::find_by_username(state.db(), username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::InvalidSession(BAD_TEACHER_CREDENTIALS))?;

    let verified = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|_| ApiError::InvalidSession(BAD_TEACHER_CREDENTIALS))?;
    if !verified {
        return Err(ApiError::InvalidSession(BAD_TEACHER_CREDENTIALS));
    }

    if !user.is_active {
        return Err(ApiError::Forbidden("Account is disabled"));
    }

    issue_session(
        &state,
        jar,
        TokenSubject {
            id: &user.id,
            role: UserRole::Teacher,
            name: &user.full_name,
            login: &user.username,
        },
    )
}

async fn register_student(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<StudentRegister>,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse>), ApiError> {
    let student_id = payload.student_id.trim();
    validate_student_id(student_id)?;
    payload.validate().map_err(|e| ApiError::Validation(e.to_string()))?;

    enforce_rate_limit(&state, &format!("rl:register:student:{student_id}")).await?;

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let student = repositories::students::create(
        state.db(),
        repositories::students::CreateStudent {
            id: &Uuid::new_v4().to_string(),
            student_id,
            name: payload.name.trim(),
            email: payload.email.as_deref().map(str::trim).filter(|email| !email.is_empty()),
            hashed_password,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create student"))?
    .ok_or_else(|| ApiError::Conflict("Student ID is already registered".to_string()))?;

    tracing::info!(student_id = %student.student_id, "Student registered");

    let subject = TokenSubject {
        id: &student.id,
        role: UserRole::Student,
        name: &student.name,
        login: &student.student_id,
    };
    let (jar, body) = issue_session(&state, jar, subject)?;
    Ok((StatusCode::CREATED, jar, body))
}

async fn login_student(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<StudentLogin>,
) -> Result<(CookieJar, Json<SessionResponse>), ApiError> {
    let student_id = payload.student_id.trim();
    validate_student_id(student_id)?;
    enforce_rate_limit(&state, &format!("rl:login:student:{student_id}")).await?;

    let student = repositories::students::find_by_student_id(state.db(), student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load student"))?
        .ok_or(ApiError::InvalidSession(BAD_STUDENT_CREDENTIALS))?;

    let verified = security::verify_password(&payload.password, &student.hashed_password)
        .map_err(|_| ApiError::InvalidSession(BAD_STUDENT_CREDENTIALS))?;
    if !verified {
        return Err(ApiError::InvalidSession(BAD_STUDENT_CREDENTIALS));
    }

    issue_session(
        &state,
        jar,
        TokenSubject {
            id: &student.id,
            role: UserRole::Student,
            name: &student.name,
            login: &student.student_id,
        },
    )
}

async fn logout(State(state): State<AppState>, jar: CookieJar) -> (StatusCode, CookieJar) {
    let name = state.settings().security().cookie_name.clone();
    (StatusCode::NO_CONTENT, jar.remove(Cookie::build((name, "")).path("/")))
}

async fn verify(CurrentUser(claims): CurrentUser) -> Json<VerifyResponse> {
    Json(VerifyResponse { authenticated: true, user: IdentityResponse::from(&claims) })
}

async fn enforce_rate_limit(state: &AppState, key: &str) -> Result<(), ApiError> {
    let allowed = state
        .redis()
        .rate_limit(key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if allowed {
        Ok(())
    } else {
        Err(ApiError::TooManyRequests("Too many attempts, try again later"))
    }
}

fn issue_session(
    state: &AppState,
    jar: CookieJar,
    subject: TokenSubject<'_>,
) -> Result<(CookieJar, Json<SessionResponse>), ApiError> {
    let settings = state.settings();
    let lifetime = security::session_lifetime(settings);
    let identity = IdentityResponse {
        id: subject.id.to_string(),
        role: subject.role,
        name: subject.name.to_string(),
        login: subject.login.to_string(),
    };

    let token = security::create_access_token(subject, settings, None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    let cookie = Cookie::build((settings.security().cookie_name.clone(), token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.security().cookie_secure)
        .max_age(lifetime);

    let body = SessionResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        expires_in: lifetime.whole_seconds(),
        user: identity,
    };

    Ok((jar.add(cookie), Json(body)))
}
