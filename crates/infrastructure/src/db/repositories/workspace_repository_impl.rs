//! 工作区 Repository 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use application::repository::WorkspaceRepository;
use domain::{InviteCode, Participant, RepositoryError, UserId, Workspace, WorkspaceId};

use super::map_sqlx_error;
use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
struct DbWorkspace {
    pub id: Uuid,
    pub name: String,
    pub invite_code: String,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbWorkspace> for Workspace {
    type Error = RepositoryError;

    fn try_from(db_workspace: DbWorkspace) -> Result<Self, Self::Error> {
        let invite_code = InviteCode::parse(db_workspace.invite_code)
            .map_err(|err| RepositoryError::storage(err.to_string()))?;
        Ok(Workspace {
            id: WorkspaceId::from(db_workspace.id),
            name: db_workspace.name,
            invite_code,
            creator_id: UserId::from(db_workspace.creator_id),
            created_at: db_workspace.created_at,
        })
    }
}

pub struct PgWorkspaceRepository {
    pool: DbPool,
}

impl PgWorkspaceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkspaceRepository for PgWorkspaceRepository {
    async fn create_with_creator(
        &self,
        workspace: Workspace,
        creator: Participant,
    ) -> Result<Workspace, RepositoryError> {
        // 工作区与创建者成员记录在同一事务内落库
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            "INSERT INTO workspaces (id, name, invite_code, creator_id, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::from(workspace.id))
        .bind(&workspace.name)
        .bind(workspace.invite_code.as_str())
        .bind(Uuid::from(workspace.creator_id))
        .bind(workspace.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query(
            "INSERT INTO participants (workspace_id, user_id, role, joined_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::from(creator.workspace_id))
        .bind(Uuid::from(creator.user_id))
        .bind(creator.role.as_str())
        .bind(creator.joined_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(workspace)
    }

    async fn find_by_id(&self, id: WorkspaceId) -> Result<Option<Workspace>, RepositoryError> {
        let row = sqlx::query_as::<_, DbWorkspace>(
            "SELECT id, name, invite_code, creator_id, created_at FROM workspaces WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(Workspace::try_from).transpose()
    }

    async fn find_by_invite_code(
        &self,
        code: &str,
    ) -> Result<Option<Workspace>, RepositoryError> {
        let row = sqlx::query_as::<_, DbWorkspace>(
            "SELECT id, name, invite_code, creator_id, created_at
             FROM workspaces WHERE invite_code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(Workspace::try_from).transpose()
    }

    async fn delete(&self, id: WorkspaceId) -> Result<(), RepositoryError> {
        // 成员、消息、文档靠外键 ON DELETE CASCADE 一并清理
        let result = sqlx::query("DELETE FROM workspaces WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
