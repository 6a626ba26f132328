//! 文档同步控制器
//!
//! 读写都要过授权关卡；每次成功变更把版本号原子加一。
//! 调用方携带 `expected_version` 时执行 compare-and-swap，
//! 不携带时保留旧的 last-write-wins 语义（遗留模式）。

use std::sync::Arc;

use domain::{Document, DocumentId, DomainError, RepositoryError, UserId, WorkspaceId};
use uuid::Uuid;

use crate::{
    clock::Clock,
    dto::DocumentDto,
    error::ApplicationError,
    guard::AccessGuard,
    repository::{DocumentPatch, DocumentRepository},
};

#[derive(Debug, Clone)]
pub struct CreateDocumentRequest {
    pub workspace_id: Uuid,
    pub caller_id: Uuid,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct UpdateDocumentRequest {
    pub workspace_id: Uuid,
    pub document_id: Uuid,
    pub caller_id: Uuid,
    pub title: String,
    pub content: String,
    /// 调用方上次读到的版本；缺省时不做冲突检查
    pub expected_version: Option<i64>,
}

pub struct DocumentServiceDependencies {
    pub guard: Arc<AccessGuard>,
    pub document_repository: Arc<dyn DocumentRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct DocumentService {
    deps: DocumentServiceDependencies,
}

impl DocumentService {
    pub fn new(deps: DocumentServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn create(
        &self,
        request: CreateDocumentRequest,
    ) -> Result<DocumentDto, ApplicationError> {
        let workspace_id = WorkspaceId::from(request.workspace_id);
        let caller_id = UserId::from(request.caller_id);
        self.deps.guard.authorize(caller_id, workspace_id, None).await?;

        let document = Document::new(
            DocumentId::from(Uuid::new_v4()),
            workspace_id,
            request.title,
            request.content,
            caller_id,
            self.deps.clock.now(),
        )?;
        let stored = self.deps.document_repository.create(document).await?;
        Ok(DocumentDto::from(&stored))
    }

    pub async fn get(
        &self,
        workspace_id: Uuid,
        document_id: Uuid,
        caller_id: Uuid,
    ) -> Result<DocumentDto, ApplicationError> {
        let workspace_id = WorkspaceId::from(workspace_id);
        self.deps
            .guard
            .authorize(UserId::from(caller_id), workspace_id, None)
            .await?;

        let document = self
            .load_in_workspace(DocumentId::from(document_id), workspace_id)
            .await?;
        Ok(DocumentDto::from(&document))
    }

    pub async fn list(
        &self,
        workspace_id: Uuid,
        caller_id: Uuid,
    ) -> Result<Vec<DocumentDto>, ApplicationError> {
        let workspace_id = WorkspaceId::from(workspace_id);
        self.deps
            .guard
            .authorize(UserId::from(caller_id), workspace_id, None)
            .await?;

        let documents = self
            .deps
            .document_repository
            .list_by_workspace(workspace_id)
            .await?;
        Ok(documents.iter().map(DocumentDto::from).collect())
    }

    pub async fn update(
        &self,
        request: UpdateDocumentRequest,
    ) -> Result<DocumentDto, ApplicationError> {
        let workspace_id = WorkspaceId::from(request.workspace_id);
        let document_id = DocumentId::from(request.document_id);
        let caller_id = UserId::from(request.caller_id);

        self.deps.guard.authorize(caller_id, workspace_id, None).await?;
        self.load_in_workspace(document_id, workspace_id).await?;

        let patch = DocumentPatch::new(
            request.title,
            request.content,
            caller_id,
            self.deps.clock.now(),
            request.expected_version,
        )?;

        match self
            .deps
            .document_repository
            .apply_update(document_id, patch)
            .await
        {
            Ok(updated) => Ok(DocumentDto::from(&updated)),
            Err(RepositoryError::Conflict) => {
                // 冲突只在携带 expected_version 时发生；回读当前版本报给调用方
                let actual = self
                    .deps
                    .document_repository
                    .find_by_id(document_id)
                    .await?
                    .map(|d| d.version)
                    .ok_or(DomainError::DocumentNotFound)?;
                let expected = request.expected_version.unwrap_or(actual);
                Err(DomainError::VersionConflict { expected, actual }.into())
            }
            Err(RepositoryError::NotFound) => Err(DomainError::DocumentNotFound.into()),
            Err(err) => Err(err.into()),
        }
    }

    /// 删除：工作区管理员或文档创建者
    pub async fn remove(
        &self,
        workspace_id: Uuid,
        document_id: Uuid,
        caller_id: Uuid,
    ) -> Result<(), ApplicationError> {
        let workspace_id = WorkspaceId::from(workspace_id);
        let document_id = DocumentId::from(document_id);

        let participant = self
            .deps
            .guard
            .authorize(UserId::from(caller_id), workspace_id, None)
            .await?;
        let document = self.load_in_workspace(document_id, workspace_id).await?;

        if !document.can_be_removed_by(&participant) {
            return Err(DomainError::InsufficientRole.into());
        }

        self.deps.document_repository.delete(document_id).await?;
        tracing::info!(
            document_id = %document_id,
            workspace_id = %workspace_id,
            "文档已删除"
        );
        Ok(())
    }

    async fn load_in_workspace(
        &self,
        document_id: DocumentId,
        workspace_id: WorkspaceId,
    ) -> Result<Document, ApplicationError> {
        let document = self
            .deps
            .document_repository
            .find_by_id(document_id)
            .await?
            .filter(|d| d.workspace_id == workspace_id)
            .ok_or(DomainError::DocumentNotFound)?;
        Ok(document)
    }
}
