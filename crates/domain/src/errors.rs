//! 领域模型错误定义
//!
//! 定义了系统中所有可能的错误类型，提供清晰的错误上下文。

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// 参数校验失败
    #[error("invalid argument {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    /// 用户不存在
    #[error("user not found")]
    UserNotFound,

    /// 工作区不存在
    #[error("workspace not found")]
    WorkspaceNotFound,

    /// 文档不存在
    #[error("document not found")]
    DocumentNotFound,

    /// 调用者不是工作区成员
    #[error("caller is not a member of the workspace")]
    NotAMember,

    /// 成员角色不满足操作要求
    #[error("insufficient role for this operation")]
    InsufficientRole,

    /// 邀请码无效
    #[error("invite code is not valid")]
    InviteCodeInvalid,

    /// 文档版本冲突（携带期望版本与当前版本）
    #[error("document version conflict: expected {expected}, actual {actual}")]
    VersionConflict { expected: i64, actual: i64 },
}

impl DomainError {
    /// 创建参数校验错误
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 存储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 目标记录不存在
    #[error("record not found")]
    NotFound,

    /// 唯一性或版本约束冲突
    #[error("record conflict")]
    Conflict,

    /// 底层存储失败
    #[error("storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;
