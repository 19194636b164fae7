pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::core::{
    config::Settings,
    redis::RedisHandle,
    state::{AppState, Collaborators},
    telemetry,
};
use crate::services::ai_grading::ChatCompletionScorer;
use crate::services::ocr::MarkerOcrService;
use crate::services::storage::{ObjectStore, StorageService};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let redis = RedisHandle::new(settings.redis().redis_url());
    if let Err(err) = redis.connect().await {
        tracing::error!(error = %err, "Failed to connect to Redis; continuing without cache");
    } else {
        tracing::info!("Redis connected successfully");
    }

    let storage = StorageService::from_settings(&settings).await?;
    let collaborators = Collaborators {
        storage: storage.map(|storage| Arc::new(storage) as Arc<dyn ObjectStore>),
        ocr: Arc::new(MarkerOcrService::from_settings(&settings)?),
        scorer: Arc::new(ChatCompletionScorer::from_settings(&settings)?),
    };
    if collaborators.storage.is_none() {
        tracing::warn!("Object storage is not configured; uploaded files will not be kept");
    }
    let state = AppState::new(settings, db_pool, redis.clone(), collaborators);

    if let Err(err) = core::bootstrap::ensure_default_teacher(&state).await {
        tracing::error!(error = %err, "Failed to ensure default teacher account");
    }
    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "AEMS API listening"
    );

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await;

    redis.disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}
