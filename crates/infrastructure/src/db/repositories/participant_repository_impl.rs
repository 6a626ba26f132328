//! 成员 Repository 实现
//!
//! (workspace_id, user_id) 是主键；upsert 更新角色而不是插入重复行。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use application::repository::ParticipantRepository;
use domain::{Participant, ParticipantRole, RepositoryError, UserId, WorkspaceId};

use super::map_sqlx_error;
use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
struct DbParticipant {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

impl TryFrom<DbParticipant> for Participant {
    type Error = RepositoryError;

    fn try_from(db_participant: DbParticipant) -> Result<Self, Self::Error> {
        let role = ParticipantRole::parse(&db_participant.role).ok_or_else(|| {
            RepositoryError::storage(format!("unknown role: {}", db_participant.role))
        })?;
        Ok(Participant {
            workspace_id: WorkspaceId::from(db_participant.workspace_id),
            user_id: UserId::from(db_participant.user_id),
            role,
            joined_at: db_participant.joined_at,
        })
    }
}

pub struct PgParticipantRepository {
    pool: DbPool,
}

impl PgParticipantRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ParticipantRepository for PgParticipantRepository {
    async fn upsert(&self, participant: Participant) -> Result<Participant, RepositoryError> {
        sqlx::query(
            "INSERT INTO participants (workspace_id, user_id, role, joined_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (workspace_id, user_id) DO UPDATE SET role = EXCLUDED.role",
        )
        .bind(Uuid::from(participant.workspace_id))
        .bind(Uuid::from(participant.user_id))
        .bind(participant.role.as_str())
        .bind(participant.joined_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(participant)
    }

    async fn find(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
    ) -> Result<Option<Participant>, RepositoryError> {
        let row = sqlx::query_as::<_, DbParticipant>(
            "SELECT workspace_id, user_id, role, joined_at
             FROM participants WHERE workspace_id = $1 AND user_id = $2",
        )
        .bind(Uuid::from(workspace_id))
        .bind(Uuid::from(user_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(Participant::try_from).transpose()
    }

    async fn list_members(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Vec<Participant>, RepositoryError> {
        let rows = sqlx::query_as::<_, DbParticipant>(
            "SELECT workspace_id, user_id, role, joined_at
             FROM participants WHERE workspace_id = $1 ORDER BY joined_at",
        )
        .bind(Uuid::from(workspace_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(Participant::try_from).collect()
    }
}
