//! 消息管线
//!
//! 校验、授权、提及解析、持久化、展开、广播，按此顺序串行完成；
//! 单实例内同一房间的消息按 post_message 完成的顺序追加和广播。

use std::sync::Arc;

use domain::{
    mention, DomainError, Message, MessageId, SenderSnapshot, UserId, WorkspaceId,
};
use uuid::Uuid;

use crate::{
    broadcaster::{RoomBroadcast, RoomBroadcaster},
    clock::Clock,
    dto::{MessageDto, UserRefDto},
    error::ApplicationError,
    guard::AccessGuard,
    repository::{MessageRepository, UserRepository},
};

/// 历史消息上限，固定 100 条，无分页游标
pub const MESSAGE_HISTORY_LIMIT: u32 = 100;

#[derive(Debug, Clone)]
pub struct PostMessageRequest {
    pub workspace_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
}

pub struct ChatServiceDependencies {
    pub guard: Arc<AccessGuard>,
    pub user_repository: Arc<dyn UserRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub clock: Arc<dyn Clock>,
    pub broadcaster: Arc<dyn RoomBroadcaster>,
}

pub struct ChatService {
    deps: ChatServiceDependencies,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        Self { deps }
    }

    /// 最近 100 条消息，旧在前
    pub async fn list_messages(
        &self,
        workspace_id: Uuid,
        caller_id: Uuid,
    ) -> Result<Vec<MessageDto>, ApplicationError> {
        let workspace_id = WorkspaceId::from(workspace_id);
        self.deps
            .guard
            .authorize(UserId::from(caller_id), workspace_id, None)
            .await?;

        let mut records = self
            .deps
            .message_repository
            .list_recent(workspace_id, MESSAGE_HISTORY_LIMIT)
            .await?;
        records.reverse();

        let mut items = Vec::with_capacity(records.len());
        for message in &records {
            let mentions = self.expand_mentions(&message.mentions).await;
            items.push(MessageDto::expand(message, mentions));
        }
        Ok(items)
    }

    pub async fn post_message(
        &self,
        request: PostMessageRequest,
    ) -> Result<MessageDto, ApplicationError> {
        // 1. 空内容直接拒绝
        if request.content.trim().is_empty() {
            return Err(DomainError::invalid_argument("content", "cannot be empty").into());
        }

        let workspace_id = WorkspaceId::from(request.workspace_id);
        let sender_id = UserId::from(request.sender_id);

        // 2. 授权关卡，失败即终止
        self.deps
            .guard
            .authorize(sender_id, workspace_id, None)
            .await?;

        // 3-4. 提及解析；解析失败降级为零提及而不是中止发送
        let mentions = self.resolve_mentions(&request.content).await;

        // 5. 捕获发送者当前目录信息的快照并持久化
        let sender = self
            .deps
            .user_repository
            .find_by_id(sender_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;

        let message = Message::new(
            MessageId::from(Uuid::new_v4()),
            workspace_id,
            SenderSnapshot::capture(&sender),
            request.content,
            mentions,
            self.deps.clock.now(),
        )?;

        let stored = self.deps.message_repository.create(message).await?;

        // 6. 把提及ID展开为轻量用户对象
        let expanded = self.expand_mentions(&stored.mentions).await;
        let dto = MessageDto::expand(&stored, expanded);

        // 7. 广播给房间内的全部在线连接
        if let Err(err) = self
            .deps
            .broadcaster
            .broadcast(RoomBroadcast::new_message(workspace_id, dto.clone()))
            .await
        {
            tracing::error!(
                workspace_id = %workspace_id,
                message_id = %stored.id,
                error = %err,
                "消息已持久化，但广播失败"
            );
            return Err(err.into());
        }

        Ok(dto)
    }

    /// 把内容中的候选提及名与目录做精确匹配。
    /// 重名用户全部命中；没有命中的候选静默丢弃；
    /// 目录查询失败时整体降级为零提及。
    async fn resolve_mentions(&self, content: &str) -> Vec<UserId> {
        let mut resolved: Vec<UserId> = Vec::new();
        for candidate in mention::extract_mention_candidates(content) {
            match self
                .deps
                .user_repository
                .find_by_display_name(&candidate)
                .await
            {
                Ok(users) => {
                    for user in users {
                        if !resolved.contains(&user.id) {
                            resolved.push(user.id);
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "提及解析失败，本条消息按零提及处理");
                    return Vec::new();
                }
            }
        }
        resolved
    }

    async fn expand_mentions(&self, ids: &[UserId]) -> Vec<UserRefDto> {
        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            match self.deps.user_repository.find_by_id(*id).await {
                Ok(Some(user)) => users.push(UserRefDto::from(&user)),
                // 目录里已不存在的用户从展开结果中消失
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(error = %err, user_id = %id, "提及展开失败，跳过该用户");
                }
            }
        }
        users
    }
}
