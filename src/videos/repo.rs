use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::videos::repo_types::{NewVideo, Video};

#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn create(&self, new: NewVideo) -> anyhow::Result<Video>;
    /// Newest upload first.
    async fn list_recent(&self) -> anyhow::Result<Vec<Video>>;
    async fn count_by_user(&self, user_id: Uuid) -> anyhow::Result<i64>;
}

#[derive(Clone)]
pub struct PgVideoStore {
    db: PgPool,
}

impl PgVideoStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VideoStore for PgVideoStore {
    async fn create(&self, new: NewVideo) -> anyhow::Result<Video> {
        let video = sqlx::query_as::<_, Video>(
            r#"
            INSERT INTO videos (id, title, description, filename, user_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, description, filename, upload_date, user_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.filename)
        .bind(new.user_id)
        .fetch_one(&self.db)
        .await
        .context("insert video")?;
        Ok(video)
    }

    async fn list_recent(&self) -> anyhow::Result<Vec<Video>> {
        let rows = sqlx::query_as::<_, Video>(
            r#"
            SELECT id, title, description, filename, upload_date, user_id
              FROM videos
             ORDER BY upload_date DESC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list videos")?;
        Ok(rows)
    }

    async fn count_by_user(&self, user_id: Uuid) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM videos WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.db)
            .await
            .context("count videos by user")?;
        Ok(count)
    }
}
