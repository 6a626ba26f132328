//! 在线状态登记表
//!
//! 每个工作区房间一份在线条目集合，以及短暂的"输入中"状态。
//! 两张表都是进程私有状态，只能通过 register/unregister 修改；
//! 每次注册/注销都会向房间推送一次完整的在线列表。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use domain::{SessionId, Timestamp, UserId, WorkspaceId};
use rand::Rng;
use tokio::sync::RwLock;

use crate::broadcaster::{RoomBroadcast, RoomBroadcaster};
use crate::dto::PresenceUserDto;

/// 输入中状态的存活窗口；客户端按约 2.8s 的节奏刷新，
/// 窗口内没有刷新即视为停止输入，无需显式停止事件。
pub const TYPING_TTL: Duration = Duration::from_millis(2800);

const PRESENCE_PALETTE: [&str; 8] = [
    "#e57373", "#64b5f6", "#81c784", "#ffb74d", "#ba68c8", "#4db6ac", "#f06292", "#a1887f",
];

/// 为新连接挑选一个展示颜色
pub fn assign_color() -> String {
    let idx = rand::rng().random_range(0..PRESENCE_PALETTE.len());
    PRESENCE_PALETTE[idx].to_owned()
}

/// 一条在线登记，生命周期与逻辑会话绑定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEntry {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub display_name: String,
    pub color: String,
    pub workspace_id: WorkspaceId,
    pub connected_at: Timestamp,
}

pub struct PresenceRegistry {
    rooms: RwLock<HashMap<WorkspaceId, Vec<PresenceEntry>>>,
    typing: RwLock<HashMap<(UserId, WorkspaceId), Instant>>,
    broadcaster: Arc<dyn RoomBroadcaster>,
}

impl PresenceRegistry {
    pub fn new(broadcaster: Arc<dyn RoomBroadcaster>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            typing: RwLock::new(HashMap::new()),
            broadcaster,
        }
    }

    /// 登记一条在线条目并向房间推送在线列表。
    /// 对同一 (用户, 工作区, 会话) 重复登记是无操作，也不会重复推送。
    pub async fn register(&self, entry: PresenceEntry) {
        let workspace_id = entry.workspace_id;
        {
            let mut rooms = self.rooms.write().await;
            let room = rooms.entry(workspace_id).or_default();
            let duplicate = room.iter().any(|existing| {
                existing.session_id == entry.session_id
                    && existing.user_id == entry.user_id
                    && existing.workspace_id == entry.workspace_id
            });
            if duplicate {
                tracing::debug!(
                    session_id = %entry.session_id,
                    user_id = %entry.user_id,
                    workspace_id = %workspace_id,
                    "重复登记被忽略"
                );
                return;
            }
            room.push(entry);
        }

        self.broadcast_room_users(workspace_id).await;
    }

    /// 注销某个会话的登记；同一用户的其他会话仍算在线。
    pub async fn unregister(&self, session_id: SessionId) {
        let workspace_id = {
            let mut rooms = self.rooms.write().await;
            let mut affected = None;
            for (workspace_id, room) in rooms.iter_mut() {
                if let Some(pos) = room.iter().position(|e| e.session_id == session_id) {
                    room.remove(pos);
                    affected = Some(*workspace_id);
                    break;
                }
            }
            if let Some(workspace_id) = affected {
                if rooms.get(&workspace_id).is_some_and(|room| room.is_empty()) {
                    rooms.remove(&workspace_id);
                }
            }
            affected
        };

        if let Some(workspace_id) = workspace_id {
            self.broadcast_room_users(workspace_id).await;
        }
    }

    /// 房间在线列表，按用户去重（多端连接的用户只出现一次）
    pub async fn list_room(&self, workspace_id: WorkspaceId) -> Vec<PresenceUserDto> {
        let rooms = self.rooms.read().await;
        let mut users: Vec<PresenceUserDto> = Vec::new();
        if let Some(room) = rooms.get(&workspace_id) {
            for entry in room {
                if users.iter().any(|u| u.user_id == uuid::Uuid::from(entry.user_id)) {
                    continue;
                }
                users.push(PresenceUserDto {
                    user_id: entry.user_id.into(),
                    display_name: entry.display_name.clone(),
                    color: entry.color.clone(),
                });
            }
        }
        users
    }

    /// 刷新输入中状态
    pub async fn mark_typing(&self, user_id: UserId, workspace_id: WorkspaceId) {
        let mut typing = self.typing.write().await;
        typing.insert((user_id, workspace_id), Instant::now());
    }

    /// 当前仍在输入的用户；读取时顺带清理过期条目
    pub async fn typing_users(&self, workspace_id: WorkspaceId) -> Vec<UserId> {
        let now = Instant::now();
        let mut typing = self.typing.write().await;
        typing.retain(|_, last| now.duration_since(*last) < TYPING_TTL);
        typing
            .keys()
            .filter(|(_, ws)| *ws == workspace_id)
            .map(|(user, _)| *user)
            .collect()
    }

    async fn broadcast_room_users(&self, workspace_id: WorkspaceId) {
        let users = self.list_room(workspace_id).await;
        if let Err(err) = self
            .broadcaster
            .broadcast(RoomBroadcast::room_users(workspace_id, users))
            .await
        {
            tracing::warn!(error = %err, workspace_id = %workspace_id, "在线列表广播失败");
        }
    }
}
