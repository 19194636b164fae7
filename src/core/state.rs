use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::{ScoringPolicy, Settings};
use crate::core::redis::RedisHandle;
use crate::services::ai_grading::AnswerScorer;
use crate::services::ocr::TextExtractor;
use crate::services::storage::ObjectStore;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    redis: RedisHandle,
    storage: Option<Arc<dyn ObjectStore>>,
    ocr: Arc<dyn TextExtractor>,
    scorer: Arc<dyn AnswerScorer>,
}

/// External collaborators that do the actual reading and marking.
pub(crate) struct Collaborators {
    pub(crate) storage: Option<Arc<dyn ObjectStore>>,
    pub(crate) ocr: Arc<dyn TextExtractor>,
    pub(crate) scorer: Arc<dyn AnswerScorer>,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        db: PgPool,
        redis: RedisHandle,
        collaborators: Collaborators,
    ) -> Self {
        let Collaborators { storage, ocr, scorer } = collaborators;
        Self { inner: Arc::new(InnerState { settings, db, redis, storage, ocr, scorer }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn scoring_policy(&self) -> &ScoringPolicy {
        &self.inner.settings.scoring().policy
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn storage(&self) -> Option<&dyn ObjectStore> {
        self.inner.storage.as_deref()
    }

    pub(crate) fn ocr(&self) -> &dyn TextExtractor {
        self.inner.ocr.as_ref()
    }

    pub(crate) fn scorer(&self) -> &dyn AnswerScorer {
        self.inner.scorer.as_ref()
    }
}
