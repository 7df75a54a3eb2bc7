use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    auth::{
        jwt::SessionKeys,
        repo::{PgUserStore, UserStore},
    },
    config::AppConfig,
    storage::{LocalStorage, StorageClient},
    videos::repo::{PgVideoStore, VideoStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub videos: Arc<dyn VideoStore>,
    pub storage: Arc<dyn StorageClient>,
    pub session_keys: Arc<SessionKeys>,
}

impl AppState {
    /// Postgres-backed stores and the local upload folder.
    pub fn init(config: AppConfig, db: PgPool) -> anyhow::Result<Self> {
        let storage: Arc<dyn StorageClient> = Arc::new(LocalStorage::new(&config.uploads.folder)?);
        Ok(Self::from_parts(
            config,
            Arc::new(PgUserStore::new(db.clone())),
            Arc::new(PgVideoStore::new(db)),
            storage,
        ))
    }

    pub fn from_parts(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        videos: Arc<dyn VideoStore>,
        storage: Arc<dyn StorageClient>,
    ) -> Self {
        let session_keys = Arc::new(SessionKeys::new(&config.session));
        Self {
            config: Arc::new(config),
            users,
            videos,
            storage,
            session_keys,
        }
    }
}
