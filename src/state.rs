use std::{convert::Infallible, future::Future, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use warp::Filter;

use crate::{
    actions::PgStore, config::Config, error::ApiError, jwt::SessionKeys, memory::MemoryStore,
    store::Store, Cache, CacheKey,
};

/// Everything a handler needs, cloned into each request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub sessions: Arc<SessionKeys>,
    pub cache: Option<Cache>,
    pub delivery_charge: f64,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, sessions: SessionKeys, delivery_charge: f64) -> Self {
        Self {
            store,
            sessions: Arc::new(sessions),
            cache: None,
            delivery_charge,
        }
    }

    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Connects every backend named by the configuration.
    pub async fn from_config(config: &Config) -> Result<Self, ApiError> {
        let sessions = SessionKeys::new(&config.session_secret)?;

        let store: Arc<dyn Store> = match &config.database_url {
            Some(url) => {
                let store = PgStore::connect(url, config.database_max_connections).await?;
                log::info!("Connected to PostgreSQL");
                Arc::new(store)
            }
            None => {
                log::warn!("DATABASE_URL not set, data lives in memory and is lost on exit");
                Arc::new(MemoryStore::new())
            }
        };

        let state = Self::new(store, sessions, config.delivery_charge);
        match &config.redis_url {
            Some(url) => match Cache::connect(url).await {
                Ok(cache) => {
                    log::info!("Connected to Redis");
                    Ok(state.with_cache(cache))
                }
                Err(e) => {
                    e.log();
                    log::warn!("Continuing without cache");
                    Ok(state)
                }
            },
            None => Ok(state),
        }
    }

    /// Reads through the cache when there is one. Cache failures fall back to `fetch`.
    pub async fn cached<T, F, Fut>(&self, key: CacheKey, fetch: F) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned + Send + Sync + Clone,
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, ApiError>> + Send,
    {
        let cache = match &self.cache {
            Some(cache) => cache,
            None => return fetch().await,
        };

        match cache.get_or(key, &fetch).await {
            Err(ApiError::Cache(e)) => {
                log::error!("Cache read failed, using the store: {e}");
                fetch().await
            }
            result => result,
        }
    }

    /// Drops every cached recipe ranking. Failures are logged, not returned.
    pub async fn invalidate_recipes(&self) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.rotate_recipe_bind().await {
                e.log();
            }
        }
    }
}

pub fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}
