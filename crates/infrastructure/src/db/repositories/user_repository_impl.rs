//! 用户目录 Repository 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use application::repository::UserRepository;
use domain::{RepositoryError, User, UserId};

use super::map_sqlx_error;
use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
struct DbUser {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DbUser> for User {
    fn from(db_user: DbUser) -> Self {
        User {
            id: UserId::from(db_user.id),
            display_name: db_user.display_name,
            email: db_user.email,
            avatar_url: db_user.avatar_url,
            created_at: db_user.created_at,
        }
    }
}

pub struct PgUserRepository {
    pool: DbPool,
}

impl PgUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        sqlx::query(
            "INSERT INTO users (id, display_name, email, avatar_url, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::from(user.id))
        .bind(&user.display_name)
        .bind(&user.email)
        .bind(&user.avatar_url)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET display_name = $2, email = $3, avatar_url = $4 WHERE id = $1",
        )
        .bind(Uuid::from(user.id))
        .bind(&user.display_name)
        .bind(&user.email)
        .bind(&user.avatar_url)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, DbUser>(
            "SELECT id, display_name, email, avatar_url, created_at FROM users WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, DbUser>(
            "SELECT id, display_name, email, avatar_url, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(User::from))
    }

    async fn find_by_display_name(&self, name: &str) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, DbUser>(
            "SELECT id, display_name, email, avatar_url, created_at
             FROM users WHERE display_name = $1",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(User::from).collect())
    }
}
