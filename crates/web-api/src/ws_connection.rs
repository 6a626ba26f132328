//! WebSocket 连接管理
//!
//! 封装单个连接的生命周期：加入房间（过授权关卡、取得会话、
//! 登记在线）、转发房间广播、输入中状态，以及断开时的清理。
//! 加入被拒绝只回一条 error 事件，连接保持打开。

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use application::{
    broadcaster::{RoomBroadcast, RoomBroadcaster},
    presence::{assign_color, PresenceEntry},
    protocol::{ClientEvent, ServerEvent},
};
use domain::{User, WorkspaceId};

use crate::state::AppState;

pub struct WsConnection {
    state: AppState,
    user: User,
}

struct JoinedRoom {
    workspace_id: WorkspaceId,
    forward_task: JoinHandle<()>,
}

impl WsConnection {
    pub fn new(state: AppState, user: User) -> Self {
        Self { state, user }
    }

    /// 连接主循环：同时处理客户端事件和房间广播的转发
    pub async fn run(self, socket: WebSocket) {
        let (mut sender, mut incoming) = socket.split();
        let (event_tx, mut event_rx) = mpsc::channel::<ServerEvent>(32);
        let mut joined: Option<JoinedRoom> = None;

        loop {
            tokio::select! {
                maybe_incoming = incoming.next() => {
                    match maybe_incoming {
                        Some(Ok(WsMessage::Text(text))) => {
                            match serde_json::from_str::<ClientEvent>(text.as_str()) {
                                Ok(event) => {
                                    if self
                                        .handle_event(event, &mut sender, &mut joined, &event_tx)
                                        .await
                                        .is_err()
                                    {
                                        break;
                                    }
                                }
                                Err(err) => {
                                    tracing::debug!(error = %err, "无法解析的客户端事件");
                                    let refused = ServerEvent::Error {
                                        code: "INVALID_EVENT".to_string(),
                                        message: "unrecognized event".to_string(),
                                    };
                                    if send_event(&mut sender, &refused).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                        Some(Ok(WsMessage::Ping(data))) => {
                            if sender.send(WsMessage::Pong(data)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(WsMessage::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            tracing::warn!(error = %err, "WebSocket 传输错误");
                            break;
                        }
                    }
                }
                forwarded = event_rx.recv() => {
                    match forwarded {
                        Some(event) => {
                            if send_event(&mut sender, &event).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        // 断开只取消该会话的在线登记，不回滚任何已进入持久化的写
        if let Some(room) = joined.take() {
            self.leave_room(room).await;
        }
        tracing::info!(user_id = %self.user.id, "WebSocket 连接已断开");
    }

    async fn handle_event(
        &self,
        event: ClientEvent,
        sender: &mut SplitSink<WebSocket, WsMessage>,
        joined: &mut Option<JoinedRoom>,
        event_tx: &mpsc::Sender<ServerEvent>,
    ) -> Result<(), ()> {
        match event {
            ClientEvent::JoinRoom { workspace_id } => {
                self.handle_join(workspace_id, sender, joined, event_tx).await
            }
            ClientEvent::Typing { workspace_id } => {
                self.handle_typing(workspace_id, sender, joined).await
            }
        }
    }

    async fn handle_join(
        &self,
        workspace_id: Uuid,
        sender: &mut SplitSink<WebSocket, WsMessage>,
        joined: &mut Option<JoinedRoom>,
        event_tx: &mpsc::Sender<ServerEvent>,
    ) -> Result<(), ()> {
        let workspace_id = WorkspaceId::from(workspace_id);

        if joined
            .as_ref()
            .is_some_and(|room| room.workspace_id == workspace_id)
        {
            // 同一房间的重复 join：重发一次在线列表即可
            let users = self.state.presence.list_room(workspace_id).await;
            return send_event(sender, &ServerEvent::RoomUsers { users }).await;
        }

        // 加入被拒绝不关闭连接，客户端可以改试其他房间
        if let Err(err) = self
            .state
            .guard
            .authorize(self.user.id, workspace_id, None)
            .await
        {
            tracing::info!(
                user_id = %self.user.id,
                workspace_id = %workspace_id,
                error = %err,
                "房间加入被拒绝"
            );
            let refused = ServerEvent::Error {
                code: "JOIN_REFUSED".to_string(),
                message: err.to_string(),
            };
            return send_event(sender, &refused).await;
        }

        // 换房：先退出旧房间
        if let Some(room) = joined.take() {
            self.leave_room(room).await;
        }

        // 先订阅再登记，自己的加入广播也会经由转发任务送达
        let mut stream = self.state.broadcaster.subscribe(workspace_id);
        let tx = event_tx.clone();
        let forward_task = tokio::spawn(async move {
            while let Some(event) = stream.recv().await {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        let attach = self
            .state
            .sessions
            .acquire(self.user.id, workspace_id)
            .await;
        if attach.fresh {
            self.state
                .presence
                .register(PresenceEntry {
                    session_id: attach.session_id,
                    user_id: self.user.id,
                    display_name: self.user.display_name.clone(),
                    color: assign_color(),
                    workspace_id,
                    connected_at: chrono::Utc::now(),
                })
                .await;
        } else {
            // 身份未变的冗余连接：复用既有会话，不产生第二条登记和重复广播
            let users = self.state.presence.list_room(workspace_id).await;
            send_event(sender, &ServerEvent::RoomUsers { users }).await?;
        }

        *joined = Some(JoinedRoom {
            workspace_id,
            forward_task,
        });
        Ok(())
    }

    async fn handle_typing(
        &self,
        workspace_id: Uuid,
        sender: &mut SplitSink<WebSocket, WsMessage>,
        joined: &mut Option<JoinedRoom>,
    ) -> Result<(), ()> {
        let workspace_id = WorkspaceId::from(workspace_id);
        if !joined
            .as_ref()
            .is_some_and(|room| room.workspace_id == workspace_id)
        {
            let refused = ServerEvent::Error {
                code: "NOT_IN_ROOM".to_string(),
                message: "join the room before typing".to_string(),
            };
            return send_event(sender, &refused).await;
        }

        self.state
            .presence
            .mark_typing(self.user.id, workspace_id)
            .await;
        if let Err(err) = self
            .state
            .broadcaster
            .broadcast(RoomBroadcast::typing(workspace_id, Uuid::from(self.user.id)))
            .await
        {
            tracing::warn!(error = %err, "输入中状态广播失败");
        }
        Ok(())
    }

    async fn leave_room(&self, room: JoinedRoom) {
        room.forward_task.abort();
        // 最后一个引用释放时才注销在线登记
        if let Some(session_id) = self
            .state
            .sessions
            .release(self.user.id, room.workspace_id)
            .await
        {
            self.state.presence.unregister(session_id).await;
        }
    }
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, WsMessage>,
    event: &ServerEvent,
) -> Result<(), ()> {
    let payload = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(err) => {
            tracing::warn!(error = %err, "事件序列化失败");
            return Ok(());
        }
    };
    sender
        .send(WsMessage::Text(payload.into()))
        .await
        .map_err(|_| ())
}
