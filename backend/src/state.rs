// src/state.rs

use std::{sync::Arc, time::Duration};

use axum::extract::FromRef;
use moka::future::Cache;
use sqlx::PgPool;

use crate::{
    config::Config,
    error::AppError,
    models::tag::Tag,
    services::ai::{AiService, DocumentFormatter, GeminiClient},
};

/// Memoized tag list, invalidated on every tag write.
pub type TagCache = Cache<&'static str, Arc<Vec<Tag>>>;

pub const TAG_CACHE_KEY: &str = "all";

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub ai: Arc<AiService>,
    pub tag_cache: TagCache,
}

impl AppState {
    /// State backed by the Gemini client.
    pub fn new(pool: PgPool, config: Config) -> Result<Self, AppError> {
        let formatter = Arc::new(GeminiClient::new(&config)?);
        Ok(Self::with_formatter(pool, config, formatter))
    }

    /// State with a custom formatter backend.
    pub fn with_formatter(
        pool: PgPool,
        config: Config,
        formatter: Arc<dyn DocumentFormatter>,
    ) -> Self {
        let ai = AiService::new(
            formatter,
            Duration::from_secs(config.ai_cache_ttl_secs),
            config.ai_cache_capacity,
        );
        let tag_cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(config.tag_cache_ttl_secs))
            .build();

        Self {
            pool,
            config,
            ai: Arc::new(ai),
            tag_cache,
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<AiService> {
    fn from_ref(state: &AppState) -> Self {
        state.ai.clone()
    }
}

impl FromRef<AppState> for TagCache {
    fn from_ref(state: &AppState) -> Self {
        state.tag_cache.clone()
    }
}
