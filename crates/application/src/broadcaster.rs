use async_trait::async_trait;
use domain::WorkspaceId;
use thiserror::Error;
use uuid::Uuid;

use crate::dto::{MessageDto, PresenceUserDto};
use crate::protocol::ServerEvent;

/// 一条发往某个工作区房间的广播
#[derive(Debug, Clone)]
pub struct RoomBroadcast {
    pub workspace_id: WorkspaceId,
    pub event: ServerEvent,
}

impl RoomBroadcast {
    pub fn room_users(workspace_id: WorkspaceId, users: Vec<PresenceUserDto>) -> Self {
        Self {
            workspace_id,
            event: ServerEvent::RoomUsers { users },
        }
    }

    pub fn new_message(workspace_id: WorkspaceId, message: MessageDto) -> Self {
        Self {
            workspace_id,
            event: ServerEvent::NewMessage { message },
        }
    }

    pub fn typing(workspace_id: WorkspaceId, user_id: Uuid) -> Self {
        Self {
            workspace_id,
            event: ServerEvent::Typing { user_id },
        }
    }
}

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("broadcast failed: {0}")]
    Failed(String),
}

impl BroadcastError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[async_trait]
pub trait RoomBroadcaster: Send + Sync {
    async fn broadcast(&self, payload: RoomBroadcast) -> Result<(), BroadcastError>;
}
