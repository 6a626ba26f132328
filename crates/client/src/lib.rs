//! 实时客户端会话管理器
//!
//! 管理一条逻辑客户端会话对房间的生命周期：
//! `Disconnected → Connecting → Joined → Disconnected`。
//! 认证失败是致命的，不重试；传输失败按固定间隔自动重连，
//! 重试次数有上限，超限后进入可观察的 ConnectionLost 终态，
//! 而不是静默吞掉。

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, http::StatusCode, Message},
    MaybeTlsStream, WebSocketStream,
};
use uuid::Uuid;

use application::protocol::{ClientEvent, ServerEvent};

/// 传输失败后的重连上限
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;
/// 重连之间的固定间隔
pub const RECONNECT_DELAY: Duration = Duration::from_millis(1000);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 会话的可观察连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Joined,
    /// 重连次数耗尽后的终态
    ConnectionLost,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("authentication rejected by server")]
    AuthenticationFailed,
    #[error("connection lost after {0} reconnect attempts")]
    ConnectionLost(u32),
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket 端点，例如 `ws://127.0.0.1:8080/api/v1/ws`
    pub server_url: String,
    /// 外部签发的会话令牌
    pub token: String,
    /// 连接后要加入的工作区
    pub workspace_id: Uuid,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay: Duration,
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>, token: impl Into<String>, workspace_id: Uuid) -> Self {
        Self {
            server_url: server_url.into(),
            token: token.into(),
            workspace_id,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

/// 一条已建立的实时会话
pub struct RealtimeSession {
    events: mpsc::UnboundedReceiver<ServerEvent>,
    commands: mpsc::UnboundedSender<ClientEvent>,
    state: watch::Receiver<ConnectionState>,
    workspace_id: Uuid,
    driver: JoinHandle<()>,
}

impl RealtimeSession {
    /// 建立连接并加入配置中的工作区房间。
    /// 认证被拒绝立刻失败；传输失败按配置的上限和间隔重试。
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let url = format!("{}?token={}", config.server_url, config.token);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let mut established = None;
        for attempt in 0..=config.max_reconnect_attempts {
            if attempt > 0 {
                tokio::time::sleep(config.reconnect_delay).await;
            }
            match connect_async(url.as_str()).await {
                Ok((ws, _response)) => {
                    established = Some(ws);
                    break;
                }
                Err(tungstenite::Error::Http(response))
                    if is_auth_rejection(response.status()) =>
                {
                    return Err(ClientError::AuthenticationFailed);
                }
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "连接失败");
                }
            }
        }
        let mut ws = established
            .ok_or(ClientError::ConnectionLost(config.max_reconnect_attempts))?;

        send_join(&mut ws, config.workspace_id)
            .await
            .map_err(|err| ClientError::Transport(err.to_string()))?;
        let _ = state_tx.send(ConnectionState::Joined);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let workspace_id = config.workspace_id;
        let driver = Driver {
            config,
            url,
            workspace_id,
            events_tx,
            commands_rx,
            state_tx,
        };
        let handle = tokio::spawn(driver.run(ws));

        Ok(Self {
            events: events_rx,
            commands: commands_tx,
            state: state_rx,
            workspace_id,
            driver: handle,
        })
    }

    /// 下一条服务端事件；会话终止后返回 None
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        self.events.recv().await
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// 可订阅的状态通道，调用方据此展示"重连中/连接已断开"
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// 等待会话进入目标状态；会话终止且未达到目标时返回 false
    pub async fn wait_for_state(&mut self, target: ConnectionState) -> bool {
        if *self.state.borrow() == target {
            return true;
        }
        while self.state.changed().await.is_ok() {
            if *self.state.borrow() == target {
                return true;
            }
        }
        *self.state.borrow() == target
    }

    /// 切换到另一个房间（重连后也会回到最新的房间）
    pub fn join_room(&self, workspace_id: Uuid) -> Result<(), ClientError> {
        self.commands
            .send(ClientEvent::JoinRoom { workspace_id })
            .map_err(|_| ClientError::Transport("session driver is gone".to_string()))
    }

    /// 按客户端节奏刷新输入中状态
    pub fn send_typing(&self) -> Result<(), ClientError> {
        self.commands
            .send(ClientEvent::Typing {
                workspace_id: self.workspace_id,
            })
            .map_err(|_| ClientError::Transport("session driver is gone".to_string()))
    }
}

impl Drop for RealtimeSession {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

enum DriveOutcome {
    /// 会话被本端关闭
    Closed,
    /// 传输层断开，需要重连
    TransportFailed,
}

struct Driver {
    config: ClientConfig,
    url: String,
    /// 当前房间；换房后重连要回到最新的房间
    workspace_id: Uuid,
    events_tx: mpsc::UnboundedSender<ServerEvent>,
    commands_rx: mpsc::UnboundedReceiver<ClientEvent>,
    state_tx: watch::Sender<ConnectionState>,
}

impl Driver {
    async fn run(mut self, ws: WsStream) {
        let mut current = ws;
        loop {
            match self.drive(current).await {
                DriveOutcome::Closed => {
                    let _ = self.state_tx.send(ConnectionState::Disconnected);
                    return;
                }
                DriveOutcome::TransportFailed => match self.reconnect().await {
                    Some(ws) => current = ws,
                    None => {
                        let _ = self.state_tx.send(ConnectionState::ConnectionLost);
                        tracing::warn!(
                            attempts = self.config.max_reconnect_attempts,
                            "重连次数耗尽，会话进入 ConnectionLost"
                        );
                        return;
                    }
                },
            }
        }
    }

    async fn drive(&mut self, ws: WsStream) -> DriveOutcome {
        let (mut sink, mut source) = ws.split();
        loop {
            tokio::select! {
                maybe_msg = source.next() => {
                    match maybe_msg {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<ServerEvent>(text.as_str()) {
                                Ok(event) => {
                                    if self.events_tx.send(event).is_err() {
                                        return DriveOutcome::Closed;
                                    }
                                }
                                Err(err) => {
                                    tracing::debug!(error = %err, "无法解析的服务端事件");
                                }
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if sink.send(Message::Pong(data)).await.is_err() {
                                return DriveOutcome::TransportFailed;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            return DriveOutcome::TransportFailed;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            tracing::warn!(error = %err, "传输错误");
                            return DriveOutcome::TransportFailed;
                        }
                    }
                }
                command = self.commands_rx.recv() => {
                    match command {
                        Some(event) => {
                            if let ClientEvent::JoinRoom { workspace_id } = &event {
                                self.workspace_id = *workspace_id;
                            }
                            let payload = match serde_json::to_string(&event) {
                                Ok(json) => json,
                                Err(err) => {
                                    tracing::warn!(error = %err, "事件序列化失败");
                                    continue;
                                }
                            };
                            if sink.send(Message::Text(payload.into())).await.is_err() {
                                return DriveOutcome::TransportFailed;
                            }
                        }
                        None => {
                            let _ = sink.send(Message::Close(None)).await;
                            return DriveOutcome::Closed;
                        }
                    }
                }
            }
        }
    }

    async fn reconnect(&mut self) -> Option<WsStream> {
        let _ = self.state_tx.send(ConnectionState::Connecting);
        for attempt in 1..=self.config.max_reconnect_attempts {
            tokio::time::sleep(self.config.reconnect_delay).await;
            match connect_async(self.url.as_str()).await {
                Ok((mut ws, _response)) => {
                    if let Err(err) = send_join(&mut ws, self.workspace_id).await {
                        tracing::warn!(attempt, error = %err, "重连后加入房间失败");
                        continue;
                    }
                    tracing::info!(attempt, "重连成功");
                    let _ = self.state_tx.send(ConnectionState::Joined);
                    return Some(ws);
                }
                Err(tungstenite::Error::Http(response))
                    if is_auth_rejection(response.status()) =>
                {
                    // 认证失败是致命的，不继续重试
                    tracing::warn!("重连时认证被拒绝");
                    return None;
                }
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "重连失败");
                }
            }
        }
        None
    }
}

async fn send_join(ws: &mut WsStream, workspace_id: Uuid) -> Result<(), tungstenite::Error> {
    let event = ClientEvent::JoinRoom { workspace_id };
    let payload = serde_json::to_string(&event)
        .map_err(|err| tungstenite::Error::Io(std::io::Error::other(err)))?;
    ws.send(Message::Text(payload.into())).await
}

fn is_auth_rejection(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}
