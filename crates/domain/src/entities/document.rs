//! 共享文档实体定义
//!
//! 版本号从 1 开始，每次成功变更严格加一；
//! 版本字段必须等于创建以来成功变更的次数。

use serde::{Deserialize, Serialize};

use crate::entities::participant::Participant;
use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{DocumentId, Timestamp, UserId, WorkspaceId};

/// 共享文档实体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// 文档唯一ID
    pub id: DocumentId,
    /// 所属工作区ID
    pub workspace_id: WorkspaceId,
    /// 标题
    pub title: String,
    /// 序列化的富文本内容
    pub content: String,
    /// 单调递增的版本号，初始为 1
    pub version: i64,
    /// 创建者ID
    pub created_by: UserId,
    /// 最后编辑者ID
    pub last_edited_by: UserId,
    /// 创建时间
    pub created_at: Timestamp,
    /// 更新时间
    pub updated_at: Timestamp,
}

impl Document {
    /// 创建新文档（版本 1）
    pub fn new(
        id: DocumentId,
        workspace_id: WorkspaceId,
        title: impl Into<String>,
        content: impl Into<String>,
        author: UserId,
        now: Timestamp,
    ) -> DomainResult<Self> {
        let title = title.into().trim().to_owned();
        Self::validate_title(&title)?;

        Ok(Self {
            id,
            workspace_id,
            title,
            content: content.into(),
            version: 1,
            created_by: author,
            last_edited_by: author,
            created_at: now,
            updated_at: now,
        })
    }

    /// 应用一次变更：覆盖标题与内容，版本严格加一
    pub fn apply_update(
        &mut self,
        title: impl Into<String>,
        content: impl Into<String>,
        editor: UserId,
        now: Timestamp,
    ) -> DomainResult<()> {
        let title = title.into().trim().to_owned();
        Self::validate_title(&title)?;

        self.title = title;
        self.content = content.into();
        self.version += 1;
        self.last_edited_by = editor;
        self.updated_at = now;
        Ok(())
    }

    /// 删除权限：工作区管理员或文档创建者
    pub fn can_be_removed_by(&self, participant: &Participant) -> bool {
        participant.is_admin() || self.created_by == participant.user_id
    }

    fn validate_title(title: &str) -> DomainResult<()> {
        if title.is_empty() {
            return Err(DomainError::invalid_argument("title", "cannot be empty"));
        }
        if title.len() > 200 {
            return Err(DomainError::invalid_argument("title", "too long"));
        }
        Ok(())
    }
}
