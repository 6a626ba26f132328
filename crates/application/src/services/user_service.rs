//! 用户目录服务
//!
//! 身份来自外部签发的会话；这里只负责在会话铸造时
//! 把目录条目补齐（按邮箱 upsert），供提及解析和快照使用。

use std::sync::Arc;

use domain::{DomainError, User, UserId};
use uuid::Uuid;

use crate::{clock::Clock, error::ApplicationError, repository::UserRepository};

#[derive(Debug, Clone)]
pub struct EnsureUserRequest {
    pub display_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct UserService {
    deps: UserServiceDependencies,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self { deps }
    }

    /// 按邮箱 upsert 目录条目；展示名或头像变化时刷新记录
    pub async fn ensure_user(&self, request: EnsureUserRequest) -> Result<User, ApplicationError> {
        let email = request.email.trim().to_owned();

        if let Some(existing) = self.deps.user_repository.find_by_email(&email).await? {
            let name_changed = existing.display_name != request.display_name.trim();
            let avatar_changed = existing.avatar_url != request.avatar_url;
            if !name_changed && !avatar_changed {
                return Ok(existing);
            }

            let refreshed = User::new(
                existing.id,
                request.display_name,
                email,
                request.avatar_url,
                existing.created_at,
            )?;
            let stored = self.deps.user_repository.update(refreshed).await?;
            return Ok(stored);
        }

        let user = User::new(
            UserId::from(Uuid::new_v4()),
            request.display_name,
            email,
            request.avatar_url,
            self.deps.clock.now(),
        )?;
        let stored = self.deps.user_repository.create(user).await?;
        tracing::info!(user_id = %stored.id, "目录新增用户");
        Ok(stored)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User, ApplicationError> {
        self.deps
            .user_repository
            .find_by_id(UserId::from(user_id))
            .await?
            .ok_or_else(|| DomainError::UserNotFound.into())
    }
}
