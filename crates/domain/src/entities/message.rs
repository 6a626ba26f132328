//! 消息实体定义
//!
//! 消息一经创建不可变。发送者信息在发送时刻做快照保存，
//! 不是对目录记录的活引用；排序键为时间戳，插入顺序决胜。

use serde::{Deserialize, Serialize};

use crate::entities::user::User;
use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{MessageId, Timestamp, UserId, WorkspaceId};

/// 发送时刻的发送者快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderSnapshot {
    /// 发送者ID
    pub user_id: UserId,
    /// 发送时刻的展示名
    pub display_name: String,
    /// 发送时刻的邮箱
    pub email: String,
    /// 发送时刻的头像URL
    pub avatar_url: Option<String>,
}

impl SenderSnapshot {
    /// 从目录条目捕获快照
    pub fn capture(user: &User) -> Self {
        Self {
            user_id: user.id,
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// 消息实体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// 消息唯一ID
    pub id: MessageId,
    /// 所属工作区ID
    pub workspace_id: WorkspaceId,
    /// 消息内容
    pub content: String,
    /// 发送者快照
    pub sender: SenderSnapshot,
    /// 已解析的提及用户ID（按内容中首次出现的顺序）
    pub mentions: Vec<UserId>,
    /// 发送时间
    pub created_at: Timestamp,
}

impl Message {
    /// 创建新消息
    pub fn new(
        id: MessageId,
        workspace_id: WorkspaceId,
        sender: SenderSnapshot,
        content: impl Into<String>,
        mentions: Vec<UserId>,
        now: Timestamp,
    ) -> DomainResult<Self> {
        let content = content.into();
        Self::validate_content(&content)?;

        Ok(Self {
            id,
            workspace_id,
            content,
            sender,
            mentions,
            created_at: now,
        })
    }

    /// 验证消息内容
    fn validate_content(content: &str) -> DomainResult<()> {
        if content.trim().is_empty() {
            return Err(DomainError::invalid_argument("content", "cannot be empty"));
        }

        if content.len() > 10000 {
            return Err(DomainError::invalid_argument("content", "too long"));
        }

        Ok(())
    }
}
