use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::db;
use crate::rollover::Archiver;
use crate::search::cache::SearchCache;
use crate::search::coordinator::SearchCoordinator;
use crate::search::provider::{OpenFoodFacts, SearchProvider};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub search: Arc<SearchCoordinator>,
    pub archiver: Arc<Archiver>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = db::connect(&config.database_url).await?;
        let provider = Arc::new(OpenFoodFacts::new(&config.search.provider_base_url)?)
            as Arc<dyn SearchProvider>;
        Ok(Self::from_parts(db, config, provider))
    }

    pub fn from_parts(
        db: SqlitePool,
        config: Arc<AppConfig>,
        provider: Arc<dyn SearchProvider>,
    ) -> Self {
        let cache = Arc::new(SearchCache::new());
        let search = Arc::new(SearchCoordinator::new(
            db.clone(),
            provider,
            cache,
            config.search.clone(),
        ));
        let archiver = Arc::new(Archiver::new(db.clone(), config.rollover.utc_offset_hours));
        Self {
            db,
            config,
            search,
            archiver,
        }
    }

    #[cfg(test)]
    pub async fn fake() -> Self {
        use crate::search::provider::RawProduct;
        use async_trait::async_trait;

        struct NullProvider;

        #[async_trait]
        impl SearchProvider for NullProvider {
            async fn search(&self, _query: &str) -> anyhow::Result<Vec<RawProduct>> {
                Ok(Vec::new())
            }
        }

        let db = db::test_pool().await;
        let config = Arc::new(AppConfig::for_tests());
        Self::from_parts(db, config, Arc::new(NullProvider))
    }
}
