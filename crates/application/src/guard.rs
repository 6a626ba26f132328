//! 授权关卡
//!
//! 所有读写操作的统一前置检查：解析调用者在工作区内的成员记录，
//! 必要时校验角色。只读，不修改任何状态；失败对调用操作是终止性的。

use std::sync::Arc;

use domain::{DomainError, Participant, ParticipantRole, UserId, WorkspaceId};

use crate::error::ApplicationError;
use crate::repository::{ParticipantRepository, WorkspaceRepository};

pub struct AccessGuard {
    workspace_repository: Arc<dyn WorkspaceRepository>,
    participant_repository: Arc<dyn ParticipantRepository>,
}

impl AccessGuard {
    pub fn new(
        workspace_repository: Arc<dyn WorkspaceRepository>,
        participant_repository: Arc<dyn ParticipantRepository>,
    ) -> Self {
        Self {
            workspace_repository,
            participant_repository,
        }
    }

    /// 解析调用者的成员记录。
    /// 工作区不存在 → `WorkspaceNotFound`；没有成员记录 → `NotAMember`；
    /// 角色不在 `required` 中 → `InsufficientRole`。
    pub async fn authorize(
        &self,
        user_id: UserId,
        workspace_id: WorkspaceId,
        required: Option<&[ParticipantRole]>,
    ) -> Result<Participant, ApplicationError> {
        self.workspace_repository
            .find_by_id(workspace_id)
            .await?
            .ok_or(DomainError::WorkspaceNotFound)?;

        let participant = self
            .participant_repository
            .find(workspace_id, user_id)
            .await?
            .ok_or(DomainError::NotAMember)?;

        if let Some(required) = required {
            if !required.contains(&participant.role) {
                return Err(DomainError::InsufficientRole.into());
            }
        }

        Ok(participant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{
        MemoryParticipantRepository, MemoryStore, MemoryWorkspaceRepository,
    };
    use crate::repository::{ParticipantRepository as _, WorkspaceRepository as _};
    use chrono::Utc;
    use domain::{InviteCode, Workspace};
    use uuid::Uuid;

    async fn setup() -> (AccessGuard, WorkspaceId, UserId, UserId) {
        let store = MemoryStore::new();
        let workspace_repository = Arc::new(MemoryWorkspaceRepository::new(store.clone()));
        let participant_repository = Arc::new(MemoryParticipantRepository::new(store));

        let admin = UserId::from(Uuid::new_v4());
        let workspace = Workspace::new(
            WorkspaceId::from(Uuid::new_v4()),
            "Acme",
            InviteCode::parse("AB12CD34").unwrap(),
            admin,
            Utc::now(),
        )
        .unwrap();
        let workspace_id = workspace.id;
        let creator = Participant::new(workspace_id, admin, ParticipantRole::Admin, Utc::now());
        workspace_repository
            .create_with_creator(workspace, creator)
            .await
            .unwrap();

        let guard = AccessGuard::new(workspace_repository, participant_repository);
        (guard, workspace_id, admin, UserId::from(Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_member_is_authorized() {
        let (guard, workspace_id, admin, _) = setup().await;
        let participant = guard.authorize(admin, workspace_id, None).await.unwrap();
        assert!(participant.is_admin());
    }

    #[tokio::test]
    async fn test_non_member_is_denied() {
        let (guard, workspace_id, _, outsider) = setup().await;
        let result = guard.authorize(outsider, workspace_id, None).await;
        assert!(matches!(
            result,
            Err(ApplicationError::Domain(DomainError::NotAMember))
        ));
    }

    #[tokio::test]
    async fn test_unknown_workspace_is_not_found() {
        let (guard, _, admin, _) = setup().await;
        let result = guard
            .authorize(admin, WorkspaceId::from(Uuid::new_v4()), None)
            .await;
        assert!(matches!(
            result,
            Err(ApplicationError::Domain(DomainError::WorkspaceNotFound))
        ));
    }

    #[tokio::test]
    async fn test_role_requirement_is_enforced() {
        let (guard, workspace_id, admin, _) = setup().await;

        // 管理员可以通过管理员角色要求
        assert!(guard
            .authorize(admin, workspace_id, Some(&[ParticipantRole::Admin]))
            .await
            .is_ok());

        // 普通成员过不了管理员角色要求
        let member_id = UserId::from(Uuid::new_v4());
        guard
            .participant_repository
            .upsert(Participant::new(
                workspace_id,
                member_id,
                ParticipantRole::Member,
                Utc::now(),
            ))
            .await
            .unwrap();
        let result = guard
            .authorize(member_id, workspace_id, Some(&[ParticipantRole::Admin]))
            .await;
        assert!(matches!(
            result,
            Err(ApplicationError::Domain(DomainError::InsufficientRole))
        ));
    }
}
