use std::sync::Arc;

use crate::auth::jwt::JwtKeys;
use crate::config::AppConfig;
use crate::store::{PgStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub keys: Arc<JwtKeys>,
}

impl AppState {
    /// Connects to Postgres and applies pending migrations.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store = PgStore::connect(&config.database_url, config.database_max_connections).await?;
        store.migrate().await?;
        Ok(Self::from_parts(Arc::new(store), Arc::new(config)))
    }

    pub fn from_parts(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Self {
        let keys = Arc::new(JwtKeys::from_config(&config.jwt));
        Self {
            store,
            config,
            keys,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::store::memory::MemoryStore;

        let config = Arc::new(AppConfig::for_tests());
        Self::from_parts(Arc::new(MemoryStore::default()), config)
    }
}
