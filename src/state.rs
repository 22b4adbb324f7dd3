use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::UserStore;

/// Shared handler state. The store is constructed exactly once at startup
/// and injected here; nothing else touches the backing file.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<UserStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let store = Arc::new(UserStore::open(config.data_file.clone()).await);
        Ok(Self { store, config })
    }

    pub fn from_parts(store: Arc<UserStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    /// State backed by a throwaway file, for tests.
    pub async fn fake() -> Self {
        let data_file =
            std::env::temp_dir().join(format!("printerd-test-{}.json", uuid::Uuid::new_v4()));
        let config = Arc::new(AppConfig {
            data_file: data_file.clone(),
            jwt: crate::config::JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
        });
        let store = Arc::new(UserStore::open(data_file).await);
        Self { store, config }
    }
}
