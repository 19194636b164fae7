use axum::{
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};

use crate::api::guards::PageSession;
use crate::core::state::AppState;
use crate::db::types::UserRole;

const TEACHER_DASHBOARD: &str = "/dashboard";
const STUDENT_DASHBOARD: &str = "/student-dashboard";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page))
        .route(TEACHER_DASHBOARD, get(teacher_dashboard))
        .route(STUDENT_DASHBOARD, get(student_dashboard))
}

async fn login_page() -> Html<&'static str> {
    Html(
        "<!doctype html><html><head><title>AEMS - Sign in</title></head>\
         <body><main id=\"login\" data-teacher-login=\"/api/auth/login\" \
         data-student-login=\"/api/auth/student-login\"></main></body></html>",
    )
}

async fn teacher_dashboard(PageSession(claims): PageSession) -> Response {
    if claims.role != UserRole::Teacher {
        return Redirect::temporary(STUDENT_DASHBOARD).into_response();
    }
    shell("Teacher dashboard", "/api/analytics/dashboard", &claims.name).into_response()
}

async fn student_dashboard(PageSession(claims): PageSession) -> Response {
    if claims.role != UserRole::Student {
        return Redirect::temporary(TEACHER_DASHBOARD).into_response();
    }
    shell("Student dashboard", "/api/student/analytics", &claims.name).into_response()
}

/// Page shell; the client fills it from `data_url`.
fn shell(title: &str, data_url: &str, user_name: &str) -> Html<String> {
    Html(format!(
        "<!doctype html><html><head><title>AEMS - {title}</title></head>\
         <body><main id=\"dashboard\" data-source=\"{data_url}\" data-user=\"{}\"></main></body></html>",
        escape_attribute(user_name)
    ))
}

fn escape_attribute(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '&' => "&amp;".to_string(),
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '"' => "&quot;".to_string(),
            '\'' => "&#39;".to_string(),
            other => other.to_string(),
        })
        .collect()
}
