use async_trait::async_trait;
use domain::{
    Document, DocumentId, DomainError, DomainResult, Message, Participant, RepositoryError,
    Timestamp, User, UserId, Workspace, WorkspaceId,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
    async fn update(&self, user: User) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    /// 按展示名精确匹配；重名用户全部返回
    async fn find_by_display_name(&self, name: &str) -> Result<Vec<User>, RepositoryError>;
}

#[async_trait]
pub trait WorkspaceRepository: Send + Sync {
    /// 原子地创建工作区并写入创建者的管理员成员记录
    async fn create_with_creator(
        &self,
        workspace: Workspace,
        creator: Participant,
    ) -> Result<Workspace, RepositoryError>;
    async fn find_by_id(&self, id: WorkspaceId) -> Result<Option<Workspace>, RepositoryError>;
    async fn find_by_invite_code(&self, code: &str) -> Result<Option<Workspace>, RepositoryError>;
    /// 删除工作区并级联删除成员、消息和文档
    async fn delete(&self, id: WorkspaceId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    async fn upsert(&self, participant: Participant) -> Result<Participant, RepositoryError>;
    async fn find(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
    ) -> Result<Option<Participant>, RepositoryError>;
    async fn list_members(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Vec<Participant>, RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError>;
    /// 返回最近的消息，新在前；时间戳相同时按插入顺序决胜
    async fn list_recent(
        &self,
        workspace_id: WorkspaceId,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError>;
}

/// 一次文档变更的全部输入；构造时完成标题校验
#[derive(Debug, Clone)]
pub struct DocumentPatch {
    pub title: String,
    pub content: String,
    pub edited_by: UserId,
    pub edited_at: Timestamp,
    /// 调用方上次读到的版本；缺省时退回 last-write-wins 旧语义
    pub expected_version: Option<i64>,
}

impl DocumentPatch {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        edited_by: UserId,
        edited_at: Timestamp,
        expected_version: Option<i64>,
    ) -> DomainResult<Self> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(DomainError::invalid_argument("title", "cannot be empty"));
        }
        if title.len() > 200 {
            return Err(DomainError::invalid_argument("title", "too long"));
        }

        Ok(Self {
            title,
            content: content.into(),
            edited_by,
            edited_at,
            expected_version,
        })
    }
}

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn create(&self, document: Document) -> Result<Document, RepositoryError>;
    async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>, RepositoryError>;
    async fn list_by_workspace(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Vec<Document>, RepositoryError>;
    /// 应用变更并把版本号原子加一。
    /// `expected_version` 不匹配时返回 `RepositoryError::Conflict`，内容保持不变。
    async fn apply_update(
        &self,
        id: DocumentId,
        patch: DocumentPatch,
    ) -> Result<Document, RepositoryError>;
    async fn delete(&self, id: DocumentId) -> Result<(), RepositoryError>;
}
