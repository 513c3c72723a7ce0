use std::{fmt::Debug, future::Future};

use rand::{distributions::Alphanumeric, Rng};
use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::ApiError;

const RECIPE_BIND_KEY: &str = "recipe-cache-key";

// Caching - keys

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum CacheKeyType {
    /// Anything derived from the recipe collection.
    Recipe,
}

impl CacheKeyType {
    pub fn new(self, key: impl ToString) -> CacheKey {
        CacheKey::from(self, key.to_string())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CacheKey {
    value: String,
    r#type: CacheKeyType,
}

impl CacheKey {
    pub fn from(r#type: CacheKeyType, value: String) -> Self {
        Self { value, r#type }
    }

    pub fn redis_key(&self) -> String {
        match self.r#type {
            CacheKeyType::Recipe => format!("recipe-{}", self.value),
        }
    }

    pub fn lifetime(&self) -> CacheLifetime {
        match self.r#type {
            CacheKeyType::Recipe => CacheLifetime::BindRecipeCache,
        }
    }
}

// Cache - wrappers

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum CacheLifetime {
    BindRecipeCache,
}

impl CacheLifetime {
    pub async fn get_cache_bind(
        &self,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<String>, ApiError> {
        match self {
            CacheLifetime::BindRecipeCache => {
                get_cache_value::<&str, String>(RECIPE_BIND_KEY, cache).await
            }
        }
    }

    pub async fn validate_cache_bind(
        &self,
        bind: &Option<String>,
        cache: &mut MultiplexedConnection,
    ) -> Result<bool, ApiError> {
        Ok(bind == &self.get_cache_bind(cache).await?)
    }
}

#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone, Debug)]
pub struct RedisValue<T> {
    pub value: T,
    lifetime: CacheLifetime,
    bind: Option<String>,
}

impl<T> RedisValue<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + Clone,
{
    async fn validate(
        &self,
        key: &CacheKey,
        cache: &mut MultiplexedConnection,
    ) -> Result<bool, ApiError> {
        if self.lifetime != key.lifetime() {
            log::error!("Found conflicting bindings for {}", key.redis_key());
            return Ok(false);
        }
        self.lifetime.validate_cache_bind(&self.bind, cache).await
    }

    /// Returns the cached value while its bind is current, otherwise runs `callback`
    /// and stores the result. The bind is read before the callback runs so a
    /// rotation during the fetch leaves the new entry already stale.
    pub async fn get_or<F, Fut>(
        key: CacheKey,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<T, ApiError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, ApiError>> + Send,
    {
        let redis_key = key.redis_key();
        let value = get_cache_value::<&str, RedisValue<T>>(&redis_key, cache)
            .await
            .unwrap_or_else(|_| {
                let mut c = cache.clone();
                let k = redis_key.to_owned();
                tokio::spawn(async move {
                    log::error!("> Failed to deserialize cached value. Deleting {}", &k);
                    if let Err(e) = delete_cache_value(k, &mut c).await {
                        log::error!("> Failed to delete cached value! {e}");
                    }
                });
                None
            });

        if let Some(value) = value {
            log::trace!("> Found {redis_key}");
            if value.validate(&key, cache).await? {
                return Ok(value.value);
            }
            log::trace!("> Invalidated {redis_key}");
        }

        log::trace!("> Fetching {redis_key}");
        let lifetime = key.lifetime();
        let bind = lifetime.get_cache_bind(cache).await?;
        let value = callback().await?;

        let stored = RedisValue {
            value: value.clone(),
            lifetime,
            bind,
        };
        if let Err(e) = set_cache_value(redis_key.as_str(), stored, cache).await {
            e.log();
        }

        Ok(value)
    }
}

/// Shared handle to the cache. Cloning shares the underlying connection.
#[derive(Clone)]
pub struct Cache {
    connection: MultiplexedConnection,
}

impl Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache").finish_non_exhaustive()
    }
}

impl Cache {
    pub async fn connect(url: &str) -> Result<Self, ApiError> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;

        Ok(Self { connection })
    }

    pub async fn get_or<T, F, Fut>(&self, key: CacheKey, callback: F) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned + Send + Sync + Clone,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, ApiError>> + Send,
    {
        let mut connection = self.connection.clone();
        RedisValue::get_or(key, &mut connection, callback).await
    }

    /// Invalidates every value bound to the recipe cache.
    pub async fn rotate_recipe_bind(&self) -> Result<(), ApiError> {
        let mut connection = self.connection.clone();
        set_cache_value(RECIPE_BIND_KEY, random_bind(), &mut connection).await
    }
}

pub fn random_bind() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), ApiError> {
    let _: () = cache.set(key, value).await?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), ApiError> {
    let _: () = cache.del(key).await?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, ApiError> {
    let value: Option<V> = cache.get(key).await?;

    Ok(value)
}
