//! 文档 Repository 实现
//!
//! 版本号用单条 UPDATE 的 `version = version + 1` 原子递增；
//! 携带 expected_version 时在同一条语句里做 compare-and-swap。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use application::repository::{DocumentPatch, DocumentRepository};
use domain::{Document, DocumentId, RepositoryError, UserId, WorkspaceId};

use super::map_sqlx_error;
use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
struct DbDocument {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub title: String,
    pub content: String,
    pub version: i64,
    pub created_by: Uuid,
    pub last_edited_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbDocument> for Document {
    fn from(db_document: DbDocument) -> Self {
        Document {
            id: DocumentId::from(db_document.id),
            workspace_id: WorkspaceId::from(db_document.workspace_id),
            title: db_document.title,
            content: db_document.content,
            version: db_document.version,
            created_by: UserId::from(db_document.created_by),
            last_edited_by: UserId::from(db_document.last_edited_by),
            created_at: db_document.created_at,
            updated_at: db_document.updated_at,
        }
    }
}

const SELECT_COLUMNS: &str =
    "id, workspace_id, title, content, version, created_by, last_edited_by, created_at, updated_at";

pub struct PgDocumentRepository {
    pool: DbPool,
}

impl PgDocumentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn create(&self, document: Document) -> Result<Document, RepositoryError> {
        sqlx::query(
            "INSERT INTO documents
                 (id, workspace_id, title, content, version, created_by, last_edited_by,
                  created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(Uuid::from(document.id))
        .bind(Uuid::from(document.workspace_id))
        .bind(&document.title)
        .bind(&document.content)
        .bind(document.version)
        .bind(Uuid::from(document.created_by))
        .bind(Uuid::from(document.last_edited_by))
        .bind(document.created_at)
        .bind(document.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(document)
    }

    async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>, RepositoryError> {
        let row = sqlx::query_as::<_, DbDocument>(&format!(
            "SELECT {SELECT_COLUMNS} FROM documents WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Document::from))
    }

    async fn list_by_workspace(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Vec<Document>, RepositoryError> {
        let rows = sqlx::query_as::<_, DbDocument>(&format!(
            "SELECT {SELECT_COLUMNS} FROM documents WHERE workspace_id = $1 ORDER BY created_at"
        ))
        .bind(Uuid::from(workspace_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn apply_update(
        &self,
        id: DocumentId,
        patch: DocumentPatch,
    ) -> Result<Document, RepositoryError> {
        let row = sqlx::query_as::<_, DbDocument>(&format!(
            "UPDATE documents
             SET title = $2, content = $3, last_edited_by = $4, updated_at = $5,
                 version = version + 1
             WHERE id = $1 AND ($6::bigint IS NULL OR version = $6)
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(Uuid::from(id))
        .bind(&patch.title)
        .bind(&patch.content)
        .bind(Uuid::from(patch.edited_by))
        .bind(patch.edited_at)
        .bind(patch.expected_version)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(db_document) => Ok(Document::from(db_document)),
            // 没有命中行：文档不存在是 NotFound，版本不匹配是 Conflict
            None => {
                let exists = sqlx::query_scalar::<_, i64>(
                    "SELECT version FROM documents WHERE id = $1",
                )
                .bind(Uuid::from(id))
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

                match exists {
                    Some(_) => Err(RepositoryError::Conflict),
                    None => Err(RepositoryError::NotFound),
                }
            }
        }
    }

    async fn delete(&self, id: DocumentId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
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
