//! WebSocket 端点
//!
//! 握手通过查询参数携带会话令牌，使用与 REST 相同的身份模型验证；
//! 验证失败在升级前以 401 拒绝。

use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::Response,
};
use serde::Deserialize;

use crate::{error::ApiError, state::AppState, ws_connection::WsConnection};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: String,
}

pub async fn websocket_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let claims = state.jwt_service.verify_token(&query.token)?;
    // 目录里拿不到调用者记录时同样拒绝升级
    let user = state.user_service.get_user(claims.user_id).await?;

    tracing::info!(user_id = %user.id, "WebSocket 升级");
    Ok(ws.on_upgrade(move |socket| WsConnection::new(state, user).run(socket)))
}
