//! Factory for creating cache store backends.

use std::sync::Arc;

use docex_core::config::{StoreConfig, StoreProvider};
use docex_core::error::{DocexError, DocexResult};
use docex_core::traits::CacheStore;
use docex_core::InMemoryCacheStore;

/// Factory for creating cache store backends.
pub struct CacheStoreFactory;

impl CacheStoreFactory {
    /// Create a cache store from the given configuration.
    pub async fn create(config: &StoreConfig) -> DocexResult<Arc<dyn CacheStore>> {
        match config.provider {
            StoreProvider::Memory => Ok(Self::memory()),

            #[cfg(feature = "redis")]
            StoreProvider::Redis => {
                let store = crate::redis_store::RedisCacheStore::new(&config.url).await?;
                Ok(Arc::new(store))
            }

            #[allow(unreachable_patterns)]
            _ => Err(DocexError::UnsupportedProvider {
                provider: format!("{:?}", config.provider),
            }),
        }
    }

    /// Create a process-local store.
    pub fn memory() -> Arc<dyn CacheStore> {
        Arc::new(InMemoryCacheStore::new())
    }

    /// Create a Redis store.
    #[cfg(feature = "redis")]
    pub async fn redis(url: &str) -> DocexResult<Arc<dyn CacheStore>> {
        let config = StoreConfig {
            provider: StoreProvider::Redis,
            url: url.to_string(),
        };
        Self::create(&config).await
    }
}
