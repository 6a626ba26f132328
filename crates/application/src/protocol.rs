//! 实时通道的事件协议
//!
//! 客户端与服务端之间的 JSON 事件，`type` 字段区分事件名。
//! 服务端事件同时作为房间广播的载荷（见 `broadcaster`）。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dto::{MessageDto, PresenceUserDto};

/// 客户端 → 服务端
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// 请求加入一个工作区房间（需要成员资格）
    JoinRoom { workspace_id: Uuid },
    /// 刷新输入中状态；没有显式的停止事件，靠 TTL 过期
    Typing { workspace_id: Uuid },
}

/// 服务端 → 客户端
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// 房间在线用户列表（注册/注销后全房间推送）
    RoomUsers { users: Vec<PresenceUserDto> },
    /// 新消息（完整展开后的载荷）
    NewMessage { message: MessageDto },
    /// 某用户正在输入
    Typing { user_id: Uuid },
    /// 操作被拒绝（例如加入房间失败）；连接保持打开
    Error { code: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_wire_format() {
        let workspace_id = Uuid::new_v4();
        let event = ClientEvent::JoinRoom { workspace_id };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "join_room");
        assert_eq!(json["workspace_id"], workspace_id.to_string());

        let parsed: ClientEvent = serde_json::from_value(json).unwrap();
        match parsed {
            ClientEvent::JoinRoom { workspace_id: id } => assert_eq!(id, workspace_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_server_event_wire_format() {
        let user_id = Uuid::new_v4();
        let event = ServerEvent::Typing { user_id };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "typing");
        assert_eq!(json["user_id"], user_id.to_string());

        let users = ServerEvent::RoomUsers { users: vec![] };
        let json = serde_json::to_value(&users).unwrap();
        assert_eq!(json["type"], "room_users");
    }
}
