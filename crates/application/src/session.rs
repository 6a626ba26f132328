//! 实时会话表
//!
//! 以 (用户, 工作区) 为键、带引用计数的显式会话表。
//! "这个身份+房间是否已有存活会话"是对这张表的显式查询，
//! 用来识别 UI 框架重挂载导致的重复连接：身份未变的冗余
//! 连接复用既有会话，而不是开出第二份登记并重复广播加入。

use std::collections::HashMap;

use domain::{SessionId, UserId, WorkspaceId};
use tokio::sync::Mutex;
use uuid::Uuid;

/// 一次 acquire 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionAttach {
    pub session_id: SessionId,
    /// true 表示这是该身份+房间的第一个存活连接
    pub fresh: bool,
}

struct SessionSlot {
    session_id: SessionId,
    refs: usize,
}

#[derive(Default)]
pub struct RoomSessionTable {
    slots: Mutex<HashMap<(UserId, WorkspaceId), SessionSlot>>,
}

impl RoomSessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为该身份+房间取得会话。已有存活会话时复用并增加引用计数。
    pub async fn acquire(&self, user_id: UserId, workspace_id: WorkspaceId) -> SessionAttach {
        let mut slots = self.slots.lock().await;
        match slots.get_mut(&(user_id, workspace_id)) {
            Some(slot) => {
                slot.refs += 1;
                tracing::debug!(
                    user_id = %user_id,
                    workspace_id = %workspace_id,
                    refs = slot.refs,
                    "复用已有实时会话"
                );
                SessionAttach {
                    session_id: slot.session_id,
                    fresh: false,
                }
            }
            None => {
                let session_id = SessionId::from(Uuid::new_v4());
                slots.insert(
                    (user_id, workspace_id),
                    SessionSlot {
                        session_id,
                        refs: 1,
                    },
                );
                SessionAttach {
                    session_id,
                    fresh: true,
                }
            }
        }
    }

    /// 释放一次引用；最后一个引用释放时返回会话ID，调用方据此注销在线登记。
    pub async fn release(&self, user_id: UserId, workspace_id: WorkspaceId) -> Option<SessionId> {
        let mut slots = self.slots.lock().await;
        let slot = slots.get_mut(&(user_id, workspace_id))?;
        slot.refs -= 1;
        if slot.refs == 0 {
            let session_id = slot.session_id;
            slots.remove(&(user_id, workspace_id));
            Some(session_id)
        } else {
            None
        }
    }

    /// 该身份+房间当前的存活会话
    pub async fn live_session(
        &self,
        user_id: UserId,
        workspace_id: WorkspaceId,
    ) -> Option<SessionId> {
        let slots = self.slots.lock().await;
        slots.get(&(user_id, workspace_id)).map(|s| s.session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_acquire_is_fresh() {
        let table = RoomSessionTable::new();
        let user = UserId::from(Uuid::new_v4());
        let workspace = WorkspaceId::from(Uuid::new_v4());

        let attach = table.acquire(user, workspace).await;
        assert!(attach.fresh);
        assert_eq!(table.live_session(user, workspace).await, Some(attach.session_id));
    }

    #[tokio::test]
    async fn test_redundant_acquire_reuses_session() {
        let table = RoomSessionTable::new();
        let user = UserId::from(Uuid::new_v4());
        let workspace = WorkspaceId::from(Uuid::new_v4());

        let first = table.acquire(user, workspace).await;
        // 组件重挂载：身份未变的第二次建连
        let second = table.acquire(user, workspace).await;

        assert!(!second.fresh);
        assert_eq!(second.session_id, first.session_id);

        // 第一次释放不结束会话
        assert_eq!(table.release(user, workspace).await, None);
        // 最后一次释放返回会话ID
        assert_eq!(table.release(user, workspace).await, Some(first.session_id));
        assert_eq!(table.live_session(user, workspace).await, None);
    }

    #[tokio::test]
    async fn test_sessions_are_scoped_per_room() {
        let table = RoomSessionTable::new();
        let user = UserId::from(Uuid::new_v4());
        let room_a = WorkspaceId::from(Uuid::new_v4());
        let room_b = WorkspaceId::from(Uuid::new_v4());

        let a = table.acquire(user, room_a).await;
        let b = table.acquire(user, room_b).await;

        assert!(a.fresh);
        assert!(b.fresh);
        assert_ne!(a.session_id, b.session_id);
    }
}
