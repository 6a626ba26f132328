//! 工作区实体定义
//!
//! 工作区（"Collab"）是成员关系与数据分区的单位。
//! 创建后除级联删除外不会被修改。

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{InviteCode, Timestamp, UserId, WorkspaceId};

/// 工作区实体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    /// 工作区唯一ID
    pub id: WorkspaceId,
    /// 工作区名称
    pub name: String,
    /// 邀请码（全局唯一）
    pub invite_code: InviteCode,
    /// 创建者ID
    pub creator_id: UserId,
    /// 创建时间
    pub created_at: Timestamp,
}

impl Workspace {
    /// 创建工作区
    pub fn new(
        id: WorkspaceId,
        name: impl Into<String>,
        invite_code: InviteCode,
        creator_id: UserId,
        now: Timestamp,
    ) -> DomainResult<Self> {
        let name = name.into().trim().to_owned();

        if name.is_empty() {
            return Err(DomainError::invalid_argument("name", "cannot be empty"));
        }
        if name.len() > 100 {
            return Err(DomainError::invalid_argument("name", "too long"));
        }

        Ok(Self {
            id,
            name,
            invite_code,
            creator_id,
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn invite() -> InviteCode {
        InviteCode::parse("AB12CD34").unwrap()
    }

    #[test]
    fn test_workspace_creation() {
        let creator = UserId::from(Uuid::new_v4());
        let workspace = Workspace::new(
            WorkspaceId::from(Uuid::new_v4()),
            "Acme",
            invite(),
            creator,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(workspace.name, "Acme");
        assert_eq!(workspace.creator_id, creator);
        assert_eq!(workspace.invite_code.as_str(), "AB12CD34");
    }

    #[test]
    fn test_workspace_name_validation() {
        let id = WorkspaceId::from(Uuid::new_v4());
        let creator = UserId::from(Uuid::new_v4());
        let now = Utc::now();

        assert!(Workspace::new(id, "", invite(), creator, now).is_err());
        assert!(Workspace::new(id, "   ", invite(), creator, now).is_err());
        assert!(Workspace::new(id, "A".repeat(101), invite(), creator, now).is_err());
    }
}
