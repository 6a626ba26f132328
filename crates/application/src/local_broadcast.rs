// 单进程内的本地广播器实现；本进程拥有全部房间
use crate::broadcaster::{BroadcastError, RoomBroadcast, RoomBroadcaster};
use crate::protocol::ServerEvent;
use async_trait::async_trait;
use domain::WorkspaceId;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct LocalRoomBroadcaster {
    sender: broadcast::Sender<RoomBroadcast>,
}

impl LocalRoomBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// 订阅某个房间的事件流
    pub fn subscribe(&self, workspace_id: WorkspaceId) -> RoomEventStream {
        RoomEventStream::new(self.sender.subscribe(), workspace_id)
    }
}

impl Default for LocalRoomBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl RoomBroadcaster for LocalRoomBroadcaster {
    async fn broadcast(&self, payload: RoomBroadcast) -> Result<(), BroadcastError> {
        // 没有任何订阅者（房间里暂无长连接）不算失败
        if let Err(err) = self.sender.send(payload) {
            tracing::trace!(error = %err, "没有在线订阅者，广播被丢弃");
        }
        Ok(())
    }
}

// 按房间过滤的事件流
pub struct RoomEventStream {
    receiver: broadcast::Receiver<RoomBroadcast>,
    workspace_id: WorkspaceId,
}

impl RoomEventStream {
    pub fn new(receiver: broadcast::Receiver<RoomBroadcast>, workspace_id: WorkspaceId) -> Self {
        Self {
            receiver,
            workspace_id,
        }
    }

    pub async fn recv(&mut self) -> Option<ServerEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(broadcast) => {
                    // 只透传属于当前房间的事件
                    if broadcast.workspace_id == self.workspace_id {
                        return Some(broadcast.event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "事件流滞后，跳过部分广播");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
