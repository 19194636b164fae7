use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;

/// Creates the configured first teacher account, or repairs its password and
/// active flag when the account already exists.
pub(crate) async fn ensure_default_teacher(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_teacher_password.is_empty() {
        tracing::warn!("FIRST_TEACHER_PASSWORD not configured; skipping default teacher creation");
        return Ok(());
    }

    let username = admin.first_teacher_username.trim();
    let existing = repositories::users::find_by_username(state.db(), username).await?;

    let Some(user) = existing else {
        let hashed_password = security::hash_password(&admin.first_teacher_password)?;
        let user = repositories::users::create(
            state.db(),
            repositories::users::CreateUser {
                id: &Uuid::new_v4().to_string(),
                username,
                hashed_password,
                full_name: &admin.first_teacher_name,
                is_active: true,
                created_at: primitive_now_utc(),
            },
        )
        .await?;
        match user {
            Some(user) => {
                tracing::info!(user_id = %user.id, username = %user.username, "Default teacher created");
            }
            None => tracing::info!(username, "Default teacher was created concurrently"),
        }
        return Ok(());
    };

    let verified = security::verify_password(&admin.first_teacher_password, &user.hashed_password)
        .unwrap_or(false);
    if verified && user.is_active {
        return Ok(());
    }

    let hashed_password = if verified {
        user.hashed_password.clone()
    } else {
        security::hash_password(&admin.first_teacher_password)?
    };
    repositories::users::update_credentials(
        state.db(),
        &user.id,
        &hashed_password,
        true,
        primitive_now_utc(),
    )
    .await?;
    tracing::info!(user_id = %user.id, "Default teacher credentials updated");

    Ok(())
}
