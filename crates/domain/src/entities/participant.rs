//! 工作区成员实体定义
//!
//! 每个 (用户, 工作区) 对至多存在一条成员记录；
//! 角色变更修改记录本身，绝不产生重复行。

use serde::{Deserialize, Serialize};

use crate::value_objects::{Timestamp, UserId, WorkspaceId};

/// 成员角色枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipantRole {
    /// 管理员（创建者默认获得）
    Admin,
    /// 普通成员（通过邀请码加入）
    Member,
}

impl Default for ParticipantRole {
    fn default() -> Self {
        Self::Member
    }
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "member" => Some(Self::Member),
            _ => None,
        }
    }
}

/// 工作区成员实体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// 工作区ID
    pub workspace_id: WorkspaceId,
    /// 用户ID
    pub user_id: UserId,
    /// 成员角色
    pub role: ParticipantRole,
    /// 加入时间
    pub joined_at: Timestamp,
}

impl Participant {
    /// 创建工作区成员
    pub fn new(
        workspace_id: WorkspaceId,
        user_id: UserId,
        role: ParticipantRole,
        joined_at: Timestamp,
    ) -> Self {
        Self {
            workspace_id,
            user_id,
            role,
            joined_at,
        }
    }

    /// 检查是否为管理员
    pub fn is_admin(&self) -> bool {
        matches!(self.role, ParticipantRole::Admin)
    }
}
