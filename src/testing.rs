//! In-memory stores and an app harness for tests.

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use tempfile::TempDir;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::{
        dto::RegisterForm,
        repo::{CreateUserError, UniqueField, UserStore},
        repo_types::{NewUser, Role, User},
        services::register_user,
    },
    config::{AppConfig, SessionConfig, UploadConfig},
    state::AppState,
    storage::{LocalStorage, StorageClient},
    videos::{
        repo::VideoStore,
        repo_types::{NewVideo, Video},
    },
};

#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.rows.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.rows.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create(&self, new: NewUser) -> Result<User, CreateUserError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|u| u.username == new.username) {
            return Err(CreateUserError::Taken(UniqueField::Username));
        }
        if rows.iter().any(|u| u.email == new.email) {
            return Err(CreateUserError::Taken(UniqueField::Email));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            role: if rows.is_empty() { Role::Admin } else { Role::Regular },
            is_subscribed: new.is_subscribed,
            subscription_start_date: new.subscription_start_date,
            subscription_end_date: new.subscription_end_date,
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(user.clone());
        Ok(user)
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        Ok(self.rows.lock().unwrap().clone())
    }
}

impl MemoryUserStore {
    /// Flips a stored user's subscription flag.
    pub fn set_subscribed(&self, id: Uuid, subscribed: bool) {
        if let Some(u) = self.rows.lock().unwrap().iter_mut().find(|u| u.id == id) {
            u.is_subscribed = subscribed;
        }
    }
}

#[derive(Default)]
pub struct MemoryVideoStore {
    rows: Mutex<Vec<Video>>,
    failing: AtomicBool,
}

impl MemoryVideoStore {
    pub fn fail_inserts(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl VideoStore for MemoryVideoStore {
    async fn create(&self, new: NewVideo) -> anyhow::Result<Video> {
        anyhow::ensure!(!self.failing.load(Ordering::SeqCst), "insert video: connection reset");
        let mut rows = self.rows.lock().unwrap();
        // strictly increasing so "newest first" is deterministic
        let upload_date = rows
            .iter()
            .map(|v| v.upload_date + time::Duration::milliseconds(1))
            .max()
            .unwrap_or_else(OffsetDateTime::now_utc);
        let video = Video {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            filename: new.filename,
            upload_date,
            user_id: new.user_id,
        };
        rows.push(video.clone());
        Ok(video)
    }

    async fn list_recent(&self) -> anyhow::Result<Vec<Video>> {
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
        Ok(rows)
    }

    async fn count_by_user(&self, user_id: Uuid) -> anyhow::Result<i64> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.user_id == user_id)
            .count() as i64)
    }
}

/// An [`AppState`] over memory stores and a throwaway upload folder.
pub struct TestApp {
    pub state: AppState,
    pub users: Arc<MemoryUserStore>,
    pub videos: Arc<MemoryVideoStore>,
    uploads: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_uploads(true)
    }

    pub fn with_uploads(enabled: bool) -> Self {
        let uploads = tempfile::tempdir().expect("temp upload dir");
        let config = AppConfig {
            database_url: "postgres://unused".into(),
            session: SessionConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 60,
                remember_ttl_days: 30,
                cookie_secure: false,
            },
            uploads: UploadConfig {
                folder: uploads.path().to_path_buf(),
                enabled,
                max_mb: 1,
            },
        };
        let users = Arc::new(MemoryUserStore::default());
        let videos = Arc::new(MemoryVideoStore::default());
        let storage: Arc<dyn StorageClient> =
            Arc::new(LocalStorage::new(uploads.path()).expect("local storage"));
        let state = AppState::from_parts(config, users.clone(), videos.clone(), storage);
        Self {
            state,
            users,
            videos,
            uploads,
        }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.uploads.path().to_path_buf()
    }

    /// Registers through the real service, so the first seeded user is admin.
    pub async fn seed_user(&self, username: &str, email: &str) -> User {
        register_user(
            self.users.as_ref(),
            RegisterForm {
                username: username.into(),
                email: email.into(),
                password: "password123".into(),
                confirm_password: "password123".into(),
            },
        )
        .await
        .expect("seed user")
    }
}
