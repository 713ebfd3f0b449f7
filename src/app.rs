// Application context.
// Wires config, logger, token storage, client and the shared cache together.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::api::{ApiClient, Collection, FileTokenStore, Record, TokenStore};
use crate::cache::ApiCache;
use crate::config::Config;
use crate::error::Result;
use crate::logger::Logger;
use crate::state::{Mutation, MutationMethod, Query, QueryOptions};

/// Shared handles for every caller of the data layer.
///
/// One cache and one client per process; the state machines created here
/// all read and invalidate the same cache.
#[derive(Clone)]
pub struct App {
    pub config: Config,
    pub logger: Logger,
    pub cache: Arc<ApiCache>,
    pub client: Arc<ApiClient>,
}

impl App {
    /// Build from configuration, persisting the auth token on disk.
    pub fn new(config: Config) -> Result<Self> {
        let tokens = Arc::new(FileTokenStore::from_config(&config)?);
        Self::with_token_store(config, tokens)
    }

    pub fn with_token_store(config: Config, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let logger = Logger::new(&config);
        let client = Arc::new(ApiClient::new(&config, tokens, logger.clone())?);
        info!(
            base_url = %config.api_base_url,
            environment = %config.environment,
            "data layer ready"
        );

        Ok(Self {
            config,
            logger,
            cache: Arc::new(ApiCache::new()),
            client,
        })
    }

    /// Cached read of `endpoint`; call [`Query::mount`] to start it.
    pub fn query<T>(&self, endpoint: impl Into<String>, options: QueryOptions<T>) -> Query<T>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        Query::new(self.client.clone(), self.cache.clone(), endpoint, options)
    }

    pub fn mutation<T>(&self, method: MutationMethod) -> Mutation<T>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        Mutation::new(self.client.clone(), method)
    }

    /// Collection whose writes invalidate this app's cache.
    pub fn collection<R: Record>(&self) -> Collection<R> {
        Collection::new(self.client.clone()).with_cache(self.cache.clone())
    }
}
