//! 内存存储实现
//!
//! 供测试和单进程开发模式使用；与 Postgres 实现行为一致，
//! 包括邀请码唯一约束、消息插入顺序决胜和文档版本的原子加一。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use domain::{
    Document, DocumentId, Message, Participant, RepositoryError, User, UserId, Workspace,
    WorkspaceId,
};
use tokio::sync::RwLock;

use crate::repository::{
    DocumentPatch, DocumentRepository, MessageRepository, ParticipantRepository, UserRepository,
    WorkspaceRepository,
};

struct StoredMessage {
    message: Message,
    seq: u64,
}

/// 全部内存表的共享容器；各 repository 持有同一个实例，
/// 以便工作区删除能级联清理成员、消息和文档。
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<UserId, User>>,
    workspaces: RwLock<HashMap<WorkspaceId, Workspace>>,
    participants: RwLock<HashMap<(WorkspaceId, UserId), Participant>>,
    messages: RwLock<Vec<StoredMessage>>,
    documents: RwLock<HashMap<DocumentId, Document>>,
    message_seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

pub struct MemoryUserRepository {
    store: Arc<MemoryStore>,
}

impl MemoryUserRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.store.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.store.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(RepositoryError::NotFound);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.store.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let users = self.store.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_display_name(&self, name: &str) -> Result<Vec<User>, RepositoryError> {
        let users = self.store.users.read().await;
        Ok(users
            .values()
            .filter(|u| u.display_name == name)
            .cloned()
            .collect())
    }
}

pub struct MemoryWorkspaceRepository {
    store: Arc<MemoryStore>,
}

impl MemoryWorkspaceRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl WorkspaceRepository for MemoryWorkspaceRepository {
    async fn create_with_creator(
        &self,
        workspace: Workspace,
        creator: Participant,
    ) -> Result<Workspace, RepositoryError> {
        let mut workspaces = self.store.workspaces.write().await;
        let mut participants = self.store.participants.write().await;

        if workspaces
            .values()
            .any(|w| w.invite_code == workspace.invite_code)
        {
            return Err(RepositoryError::Conflict);
        }

        workspaces.insert(workspace.id, workspace.clone());
        participants.insert((creator.workspace_id, creator.user_id), creator);
        Ok(workspace)
    }

    async fn find_by_id(&self, id: WorkspaceId) -> Result<Option<Workspace>, RepositoryError> {
        let workspaces = self.store.workspaces.read().await;
        Ok(workspaces.get(&id).cloned())
    }

    async fn find_by_invite_code(
        &self,
        code: &str,
    ) -> Result<Option<Workspace>, RepositoryError> {
        let workspaces = self.store.workspaces.read().await;
        Ok(workspaces
            .values()
            .find(|w| w.invite_code.as_str() == code)
            .cloned())
    }

    async fn delete(&self, id: WorkspaceId) -> Result<(), RepositoryError> {
        let mut workspaces = self.store.workspaces.write().await;
        if workspaces.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }

        // 级联删除成员、消息和文档
        let mut participants = self.store.participants.write().await;
        participants.retain(|(workspace_id, _), _| *workspace_id != id);
        let mut messages = self.store.messages.write().await;
        messages.retain(|stored| stored.message.workspace_id != id);
        let mut documents = self.store.documents.write().await;
        documents.retain(|_, document| document.workspace_id != id);
        Ok(())
    }
}

pub struct MemoryParticipantRepository {
    store: Arc<MemoryStore>,
}

impl MemoryParticipantRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ParticipantRepository for MemoryParticipantRepository {
    async fn upsert(&self, participant: Participant) -> Result<Participant, RepositoryError> {
        let mut participants = self.store.participants.write().await;
        participants.insert(
            (participant.workspace_id, participant.user_id),
            participant.clone(),
        );
        Ok(participant)
    }

    async fn find(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
    ) -> Result<Option<Participant>, RepositoryError> {
        let participants = self.store.participants.read().await;
        Ok(participants.get(&(workspace_id, user_id)).cloned())
    }

    async fn list_members(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Vec<Participant>, RepositoryError> {
        let participants = self.store.participants.read().await;
        let mut members: Vec<Participant> = participants
            .values()
            .filter(|p| p.workspace_id == workspace_id)
            .cloned()
            .collect();
        members.sort_by_key(|p| p.joined_at);
        Ok(members)
    }
}

pub struct MemoryMessageRepository {
    store: Arc<MemoryStore>,
}

impl MemoryMessageRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
        let seq = self.store.message_seq.fetch_add(1, Ordering::SeqCst);
        let mut messages = self.store.messages.write().await;
        messages.push(StoredMessage {
            message: message.clone(),
            seq,
        });
        Ok(message)
    }

    async fn list_recent(
        &self,
        workspace_id: WorkspaceId,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        let messages = self.store.messages.read().await;
        let mut room: Vec<&StoredMessage> = messages
            .iter()
            .filter(|stored| stored.message.workspace_id == workspace_id)
            .collect();
        // 时间戳升序，相同时间戳按插入顺序
        room.sort_by(|a, b| {
            a.message
                .created_at
                .cmp(&b.message.created_at)
                .then(a.seq.cmp(&b.seq))
        });
        // 取最近 limit 条，新在前
        Ok(room
            .into_iter()
            .rev()
            .take(limit as usize)
            .map(|stored| stored.message.clone())
            .collect())
    }
}

pub struct MemoryDocumentRepository {
    store: Arc<MemoryStore>,
}

impl MemoryDocumentRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DocumentRepository for MemoryDocumentRepository {
    async fn create(&self, document: Document) -> Result<Document, RepositoryError> {
        let mut documents = self.store.documents.write().await;
        documents.insert(document.id, document.clone());
        Ok(document)
    }

    async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>, RepositoryError> {
        let documents = self.store.documents.read().await;
        Ok(documents.get(&id).cloned())
    }

    async fn list_by_workspace(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Vec<Document>, RepositoryError> {
        let documents = self.store.documents.read().await;
        let mut list: Vec<Document> = documents
            .values()
            .filter(|d| d.workspace_id == workspace_id)
            .cloned()
            .collect();
        list.sort_by_key(|d| d.created_at);
        Ok(list)
    }

    async fn apply_update(
        &self,
        id: DocumentId,
        patch: DocumentPatch,
    ) -> Result<Document, RepositoryError> {
        let mut documents = self.store.documents.write().await;
        let document = documents.get_mut(&id).ok_or(RepositoryError::NotFound)?;

        if let Some(expected) = patch.expected_version {
            if document.version != expected {
                return Err(RepositoryError::Conflict);
            }
        }

        document
            .apply_update(patch.title, patch.content, patch.edited_by, patch.edited_at)
            .map_err(|err| RepositoryError::storage(err.to_string()))?;
        Ok(document.clone())
    }

    async fn delete(&self, id: DocumentId) -> Result<(), RepositoryError> {
        let mut documents = self.store.documents.write().await;
        if documents.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
