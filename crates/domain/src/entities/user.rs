//! 用户目录实体定义
//!
//! 身份由外部会话提供，这里只维护提及解析、发送者快照
//! 和在线列表所需要的目录信息。

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{Timestamp, UserId};

/// 用户目录条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// 用户唯一ID
    pub id: UserId,
    /// 展示名（提及解析按它做精确匹配）
    pub display_name: String,
    /// 邮箱（目录内唯一）
    pub email: String,
    /// 头像URL（可选）
    pub avatar_url: Option<String>,
    /// 创建时间
    pub created_at: Timestamp,
}

impl User {
    /// 创建用户目录条目
    pub fn new(
        id: UserId,
        display_name: impl Into<String>,
        email: impl Into<String>,
        avatar_url: Option<String>,
        now: Timestamp,
    ) -> DomainResult<Self> {
        let display_name = display_name.into().trim().to_owned();
        let email = email.into().trim().to_owned();

        if display_name.is_empty() {
            return Err(DomainError::invalid_argument("display_name", "cannot be empty"));
        }
        if display_name.len() > 50 {
            return Err(DomainError::invalid_argument("display_name", "too long"));
        }
        if !email.contains('@') {
            return Err(DomainError::invalid_argument("email", "must contain '@'"));
        }

        Ok(Self {
            id,
            display_name,
            email,
            avatar_url,
            created_at: now,
        })
    }
}
