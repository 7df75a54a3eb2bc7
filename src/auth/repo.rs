use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};

const USER_COLUMNS: &str = "id, username, email, password_hash, role, is_subscribed, \
                            subscription_start_date, subscription_end_date, created_at";

const UNIQUE_VIOLATION: &str = "23505";
const USERNAME_KEY: &str = "users_username_key";
const EMAIL_KEY: &str = "users_email_key";

/// A unique column of `users`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
}

impl UniqueField {
    pub fn as_str(self) -> &'static str {
        match self {
            UniqueField::Username => "username",
            UniqueField::Email => "email",
        }
    }
}

#[derive(Debug, Error)]
pub enum CreateUserError {
    #[error("{} is already taken", .0.as_str())]
    Taken(UniqueField),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn unique_violation(e: &sqlx::Error) -> Option<UniqueField> {
    let db = e.as_database_error()?;
    if db.code().as_deref() != Some(UNIQUE_VIOLATION) {
        return None;
    }
    match db.constraint()? {
        USERNAME_KEY => Some(UniqueField::Username),
        EMAIL_KEY => Some(UniqueField::Email),
        _ => None,
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    /// Inserts the user. The very first user stored becomes `Role::Admin`,
    /// everyone after that `Role::Regular`; the decision is atomic with the insert.
    /// A username or email that is already stored yields [`CreateUserError::Taken`].
    async fn create(&self, new: NewUser) -> Result<User, CreateUserError>;
    async fn list(&self) -> anyhow::Result<Vec<User>>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_one(&self, column: &str, value: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await
            .with_context(|| format!("find user by {column}"))?;
        Ok(user)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find user by id")?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        self.find_one("email", email).await
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        self.find_one("username", username).await
    }

    async fn create(&self, new: NewUser) -> Result<User, CreateUserError> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        // Serialize registrations so two concurrent "first" users cannot both see an empty table.
        sqlx::query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await
            .context("lock users")?;

        let sql = format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, role, is_subscribed,
                               subscription_start_date, subscription_end_date)
            SELECT $1, $2, $3, $4,
                   CASE WHEN EXISTS (SELECT 1 FROM users)
                        THEN 'regular'::user_role
                        ELSE 'admin'::user_role
                   END,
                   $5, $6, $7
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.username)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(new.is_subscribed)
            .bind(new.subscription_start_date)
            .bind(new.subscription_end_date)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match unique_violation(&e) {
                Some(field) => CreateUserError::Taken(field),
                None => CreateUserError::Other(anyhow::Error::new(e).context("insert user")),
            })?;

        tx.commit().await.context("commit tx")?;
        Ok(user)
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC");
        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.db)
            .await
            .context("list users")?;
        Ok(users)
    }
}
