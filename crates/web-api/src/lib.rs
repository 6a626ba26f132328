//! Web API 层
//!
//! REST 路由、WebSocket 端点、会话令牌与错误映射。

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;
pub mod websocket;
pub mod ws_connection;

pub use auth::{Claims, JwtService, SessionResponse};
pub use config::JwtConfig;
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
