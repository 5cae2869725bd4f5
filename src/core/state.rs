use std::sync::Arc;

use sqlx::PgPool;

use crate::core::{config::Settings, redis::RedisHandle};
use crate::services::essay_evaluation::EssayScorer;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    redis: RedisHandle,
    essay_scorer: Arc<dyn EssayScorer>,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        db: PgPool,
        redis: RedisHandle,
        essay_scorer: Arc<dyn EssayScorer>,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, redis, essay_scorer }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn essay_scorer(&self) -> &dyn EssayScorer {
        self.inner.essay_scorer.as_ref()
    }
}
