//! 消息 Repository 实现
//!
//! 排序索引 (workspace_id, created_at, seq)；seq 用插入顺序给
//! 相同时间戳的消息决胜。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use application::repository::MessageRepository;
use domain::{Message, MessageId, RepositoryError, SenderSnapshot, UserId, WorkspaceId};

use super::map_sqlx_error;
use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
struct DbMessage {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub content: String,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub sender_email: String,
    pub sender_avatar_url: Option<String>,
    pub mentions: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<DbMessage> for Message {
    fn from(db_message: DbMessage) -> Self {
        Message {
            id: MessageId::from(db_message.id),
            workspace_id: WorkspaceId::from(db_message.workspace_id),
            content: db_message.content,
            sender: SenderSnapshot {
                user_id: UserId::from(db_message.sender_id),
                display_name: db_message.sender_name,
                email: db_message.sender_email,
                avatar_url: db_message.sender_avatar_url,
            },
            mentions: db_message.mentions.into_iter().map(UserId::from).collect(),
            created_at: db_message.created_at,
        }
    }
}

pub struct PgMessageRepository {
    pool: DbPool,
}

impl PgMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
        let mentions: Vec<Uuid> = message.mentions.iter().map(|id| Uuid::from(*id)).collect();

        sqlx::query(
            "INSERT INTO messages
                 (id, workspace_id, content, sender_id, sender_name, sender_email,
                  sender_avatar_url, mentions, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.workspace_id))
        .bind(&message.content)
        .bind(Uuid::from(message.sender.user_id))
        .bind(&message.sender.display_name)
        .bind(&message.sender.email)
        .bind(&message.sender.avatar_url)
        .bind(&mentions)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(message)
    }

    async fn list_recent(
        &self,
        workspace_id: WorkspaceId,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query_as::<_, DbMessage>(
            "SELECT id, workspace_id, content, sender_id, sender_name, sender_email,
                    sender_avatar_url, mentions, created_at
             FROM messages
             WHERE workspace_id = $1
             ORDER BY created_at DESC, seq DESC
             LIMIT $2",
        )
        .bind(Uuid::from(workspace_id))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Message::from).collect())
    }
}
