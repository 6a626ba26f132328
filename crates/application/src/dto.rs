use domain::{
    Document, Message, Participant, ParticipantRole, SenderSnapshot, Timestamp, User, Workspace,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 轻量用户引用（消息发送者与提及展开共用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRefDto {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

impl From<&User> for UserRefDto {
    fn from(user: &User) -> Self {
        Self {
            id: Uuid::from(user.id),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

impl From<&SenderSnapshot> for UserRefDto {
    fn from(sender: &SenderSnapshot) -> Self {
        Self {
            id: Uuid::from(sender.user_id),
            display_name: sender.display_name.clone(),
            email: sender.email.clone(),
            avatar_url: sender.avatar_url.clone(),
        }
    }
}

/// 完整展开后的消息载荷（REST 响应与房间广播共用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub content: String,
    pub sender: UserRefDto,
    pub mentions: Vec<UserRefDto>,
    pub created_at: Timestamp,
}

impl MessageDto {
    /// 由存储消息与已展开的提及用户组装
    pub fn expand(message: &Message, mentions: Vec<UserRefDto>) -> Self {
        Self {
            id: Uuid::from(message.id),
            workspace_id: Uuid::from(message.workspace_id),
            content: message.content.clone(),
            sender: UserRefDto::from(&message.sender),
            mentions,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceDto {
    pub id: Uuid,
    pub name: String,
    pub invite_code: String,
    pub creator_id: Uuid,
    pub created_at: Timestamp,
}

impl From<&Workspace> for WorkspaceDto {
    fn from(workspace: &Workspace) -> Self {
        Self {
            id: Uuid::from(workspace.id),
            name: workspace.name.clone(),
            invite_code: workspace.invite_code.as_str().to_owned(),
            creator_id: Uuid::from(workspace.creator_id),
            created_at: workspace.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantDto {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: ParticipantRole,
    pub joined_at: Timestamp,
}

impl From<&Participant> for ParticipantDto {
    fn from(participant: &Participant) -> Self {
        Self {
            workspace_id: Uuid::from(participant.workspace_id),
            user_id: Uuid::from(participant.user_id),
            role: participant.role,
            joined_at: participant.joined_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDto {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub title: String,
    pub content: String,
    pub version: i64,
    pub created_by: Uuid,
    pub last_edited_by: Uuid,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&Document> for DocumentDto {
    fn from(document: &Document) -> Self {
        Self {
            id: Uuid::from(document.id),
            workspace_id: Uuid::from(document.workspace_id),
            title: document.title.clone(),
            content: document.content.clone(),
            version: document.version,
            created_by: Uuid::from(document.created_by),
            last_edited_by: Uuid::from(document.last_edited_by),
            created_at: document.created_at,
            updated_at: document.updated_at,
        }
    }
}

/// 房间在线列表中的一项（同一用户多端连接时只出现一次）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUserDto {
    pub user_id: Uuid,
    pub display_name: String,
    pub color: String,
}
