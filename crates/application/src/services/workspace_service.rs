//! 工作区服务
//!
//! 创建工作区（创建者写入管理员成员记录、签发唯一邀请码）、
//! 邀请码兑换、级联删除。

use std::sync::Arc;

use domain::{
    DomainError, InviteCode, Participant, ParticipantRole, RepositoryError, UserId, Workspace,
    WorkspaceId,
};
use rand::Rng;
use uuid::Uuid;

use crate::{
    clock::Clock,
    dto::{ParticipantDto, WorkspaceDto},
    error::ApplicationError,
    guard::AccessGuard,
    repository::{ParticipantRepository, UserRepository, WorkspaceRepository},
};

const INVITE_CODE_LEN: usize = 8;
// 邀请码随机碰撞时的重试次数
const INVITE_CODE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct CreateWorkspaceRequest {
    pub name: String,
    pub creator_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct JoinWorkspaceRequest {
    pub invite_code: String,
    pub user_id: Uuid,
}

pub struct WorkspaceServiceDependencies {
    pub workspace_repository: Arc<dyn WorkspaceRepository>,
    pub participant_repository: Arc<dyn ParticipantRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub guard: Arc<AccessGuard>,
    pub clock: Arc<dyn Clock>,
}

pub struct WorkspaceService {
    deps: WorkspaceServiceDependencies,
}

impl WorkspaceService {
    pub fn new(deps: WorkspaceServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn create_workspace(
        &self,
        request: CreateWorkspaceRequest,
    ) -> Result<WorkspaceDto, ApplicationError> {
        let creator_id = UserId::from(request.creator_id);
        self.deps
            .user_repository
            .find_by_id(creator_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;

        let now = self.deps.clock.now();

        for _ in 0..INVITE_CODE_ATTEMPTS {
            let invite_code = InviteCode::parse(generate_invite_code())?;
            let workspace = Workspace::new(
                WorkspaceId::from(Uuid::new_v4()),
                request.name.clone(),
                invite_code,
                creator_id,
                now,
            )?;
            let creator =
                Participant::new(workspace.id, creator_id, ParticipantRole::Admin, now);

            match self
                .deps
                .workspace_repository
                .create_with_creator(workspace, creator)
                .await
            {
                Ok(stored) => {
                    tracing::info!(workspace_id = %stored.id, "工作区创建成功");
                    return Ok(WorkspaceDto::from(&stored));
                }
                // 邀请码撞了唯一约束，换一个重试
                Err(RepositoryError::Conflict) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(ApplicationError::infrastructure(
            "could not allocate a unique invite code",
        ))
    }

    /// 兑换邀请码。已是成员时幂等返回现有记录，
    /// 绝不产生重复行，也不改动创建者的管理员角色。
    pub async fn join_workspace(
        &self,
        request: JoinWorkspaceRequest,
    ) -> Result<ParticipantDto, ApplicationError> {
        let user_id = UserId::from(request.user_id);
        self.deps
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;

        let code = InviteCode::parse(request.invite_code)
            .map_err(|_| DomainError::InviteCodeInvalid)?;
        let workspace = self
            .deps
            .workspace_repository
            .find_by_invite_code(code.as_str())
            .await?
            .ok_or(DomainError::InviteCodeInvalid)?;

        if let Some(existing) = self
            .deps
            .participant_repository
            .find(workspace.id, user_id)
            .await?
        {
            return Ok(ParticipantDto::from(&existing));
        }

        let member = Participant::new(
            workspace.id,
            user_id,
            ParticipantRole::Member,
            self.deps.clock.now(),
        );
        let stored = self.deps.participant_repository.upsert(member).await?;
        tracing::info!(
            workspace_id = %workspace.id,
            user_id = %user_id,
            "邀请码兑换成功"
        );
        Ok(ParticipantDto::from(&stored))
    }

    /// 删除工作区（仅管理员）；成员、消息、文档级联删除
    pub async fn delete_workspace(
        &self,
        workspace_id: Uuid,
        caller_id: Uuid,
    ) -> Result<(), ApplicationError> {
        let workspace_id = WorkspaceId::from(workspace_id);
        self.deps
            .guard
            .authorize(
                UserId::from(caller_id),
                workspace_id,
                Some(&[ParticipantRole::Admin]),
            )
            .await?;

        self.deps.workspace_repository.delete(workspace_id).await?;
        tracing::info!(workspace_id = %workspace_id, "工作区已删除");
        Ok(())
    }

    pub async fn get_workspace(
        &self,
        workspace_id: Uuid,
        caller_id: Uuid,
    ) -> Result<WorkspaceDto, ApplicationError> {
        let workspace_id = WorkspaceId::from(workspace_id);
        self.deps
            .guard
            .authorize(UserId::from(caller_id), workspace_id, None)
            .await?;

        let workspace = self
            .deps
            .workspace_repository
            .find_by_id(workspace_id)
            .await?
            .ok_or(DomainError::WorkspaceNotFound)?;
        Ok(WorkspaceDto::from(&workspace))
    }

    pub async fn list_members(
        &self,
        workspace_id: Uuid,
        caller_id: Uuid,
    ) -> Result<Vec<ParticipantDto>, ApplicationError> {
        let workspace_id = WorkspaceId::from(workspace_id);
        self.deps
            .guard
            .authorize(UserId::from(caller_id), workspace_id, None)
            .await?;

        let members = self
            .deps
            .participant_repository
            .list_members(workspace_id)
            .await?;
        Ok(members.iter().map(ParticipantDto::from).collect())
    }
}

fn generate_invite_code() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(INVITE_CODE_LEN)
        .map(char::from)
        .collect()
}
