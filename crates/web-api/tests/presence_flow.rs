mod support;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use support::{spawn_app, TestApp};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect_ws(url: &str) -> WsStream {
    let (ws, _) = connect_async(url).await.expect("ws connect");
    ws
}

async fn send_join(ws: &mut WsStream, workspace_id: Uuid) {
    let event = json!({ "type": "join_room", "workspace_id": workspace_id });
    ws.send(Message::Text(event.to_string().into()))
        .await
        .expect("send join_room");
}

async fn next_event(ws: &mut WsStream) -> serde_json::Value {
    loop {
        let msg = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("等待事件超时")
            .expect("stream ended")
            .expect("ws error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("event json");
        }
    }
}

/// 跳过无关事件，直到等到指定类型
async fn wait_for_event(ws: &mut WsStream, event_type: &str) -> serde_json::Value {
    for _ in 0..10 {
        let event = next_event(ws).await;
        if event["type"] == event_type {
            return event;
        }
    }
    panic!("没有等到 {} 事件", event_type);
}

async fn online_users(app: &TestApp, token: &str, workspace_id: Uuid) -> Vec<serde_json::Value> {
    app.client
        .get(format!(
            "{}/api/v1/collab/{}/online",
            app.base_url, workspace_id
        ))
        .bearer_auth(token)
        .send()
        .await
        .expect("get online")
        .json::<Vec<serde_json::Value>>()
        .await
        .expect("online json")
}

#[tokio::test]
async fn presence_register_and_unregister_flow() {
    let app = spawn_app().await;
    let (alice_id, alice_token) = app.create_session("Alice", "alice@example.com").await;
    let (bob_id, bob_token) = app.create_session("Bob", "bob@example.com").await;
    let (workspace_id, invite_code) = app.create_workspace(&alice_token, "Acme").await;
    app.join_workspace(&bob_token, &invite_code).await;

    // 初始状态：没有在线用户
    assert!(online_users(&app, &alice_token, workspace_id).await.is_empty());

    // Alice 连接并加入房间
    let mut ws1 = connect_ws(&app.ws_url(&alice_token)).await;
    send_join(&mut ws1, workspace_id).await;

    let event = wait_for_event(&mut ws1, "room_users").await;
    let users = event["users"].as_array().expect("users");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["user_id"], alice_id.to_string());

    assert_eq!(online_users(&app, &alice_token, workspace_id).await.len(), 1);

    // Bob 也连接
    let mut ws2 = connect_ws(&app.ws_url(&bob_token)).await;
    send_join(&mut ws2, workspace_id).await;

    // 双方都收到两人的在线列表
    let event = wait_for_event(&mut ws2, "room_users").await;
    assert_eq!(event["users"].as_array().expect("users").len(), 2);
    let event = wait_for_event(&mut ws1, "room_users").await;
    assert_eq!(event["users"].as_array().expect("users").len(), 2);

    // Alice 断开，Bob 收到只剩一人的列表
    ws1.close(None).await.expect("close ws1");
    let event = wait_for_event(&mut ws2, "room_users").await;
    let users = event["users"].as_array().expect("users");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["user_id"], bob_id.to_string());

    // Bob 断开后房间清空
    ws2.close(None).await.expect("close ws2");
    for _ in 0..20 {
        if online_users(&app, &bob_token, workspace_id).await.is_empty() {
            return;
        }
        sleep(Duration::from_millis(50)).await;
    }
    panic!("断开后在线列表没有清空");
}

#[tokio::test]
async fn redundant_connection_reuses_the_session() {
    // UI 框架重挂载的场景：同一身份对同一房间的第二条连接
    // 复用既有会话，不产生重复登记
    let app = spawn_app().await;
    let (alice_id, alice_token) = app.create_session("Alice", "alice@example.com").await;
    let (bob_id, bob_token) = app.create_session("Bob", "bob@example.com").await;
    let (workspace_id, invite_code) = app.create_workspace(&alice_token, "Acme").await;
    app.join_workspace(&bob_token, &invite_code).await;

    let mut ws1 = connect_ws(&app.ws_url(&alice_token)).await;
    send_join(&mut ws1, workspace_id).await;
    wait_for_event(&mut ws1, "room_users").await;

    // 身份未变的第二条连接
    let mut ws2 = connect_ws(&app.ws_url(&alice_token)).await;
    send_join(&mut ws2, workspace_id).await;
    let event = wait_for_event(&mut ws2, "room_users").await;
    assert_eq!(event["users"].as_array().expect("users").len(), 1);

    // 在线列表里 Alice 仍然只出现一次
    let online = online_users(&app, &alice_token, workspace_id).await;
    assert_eq!(online.len(), 1);
    assert_eq!(online[0]["user_id"], alice_id.to_string());

    // Bob 加入后看到的列表也只有两个人
    let mut ws3 = connect_ws(&app.ws_url(&bob_token)).await;
    send_join(&mut ws3, workspace_id).await;
    let event = wait_for_event(&mut ws3, "room_users").await;
    let users = event["users"].as_array().expect("users");
    assert_eq!(users.len(), 2);

    // 关掉一条 Alice 的连接：会话还有引用，Alice 仍在线
    ws2.close(None).await.expect("close ws2");
    sleep(Duration::from_millis(100)).await;
    let online = online_users(&app, &bob_token, workspace_id).await;
    assert_eq!(online.len(), 2);

    // 关掉最后一条连接才下线
    ws1.close(None).await.expect("close ws1");
    let event = wait_for_event(&mut ws3, "room_users").await;
    let users = event["users"].as_array().expect("users");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["user_id"], bob_id.to_string());
}

#[tokio::test]
async fn refused_join_keeps_the_socket_usable() {
    let app = spawn_app().await;
    let (_, alice_token) = app.create_session("Alice", "alice@example.com").await;
    let (_, bob_token) = app.create_session("Bob", "bob@example.com").await;
    // Bob 只在第二个工作区有成员资格
    let (private_ws, _) = app.create_workspace(&alice_token, "Private").await;
    let (shared_ws, invite_code) = app.create_workspace(&alice_token, "Shared").await;
    app.join_workspace(&bob_token, &invite_code).await;

    let mut ws = connect_ws(&app.ws_url(&bob_token)).await;

    // 加入无成员资格的房间：拿到 error 事件，连接不关闭
    send_join(&mut ws, private_ws).await;
    let event = next_event(&mut ws).await;
    assert_eq!(event["type"], "error");
    assert_eq!(event["code"], "JOIN_REFUSED");

    // 同一条连接还能加入有资格的房间
    send_join(&mut ws, shared_ws).await;
    let event = wait_for_event(&mut ws, "room_users").await;
    assert_eq!(event["users"].as_array().expect("users").len(), 1);
}

#[tokio::test]
async fn invalid_handshake_token_is_rejected() {
    let app = spawn_app().await;
    let url = app.ws_url("not-a-valid-token");
    assert!(connect_async(url.as_str()).await.is_err());
}

#[tokio::test]
async fn typing_state_is_broadcast_to_the_room() {
    let app = spawn_app().await;
    let (_, alice_token) = app.create_session("Alice", "alice@example.com").await;
    let (bob_id, bob_token) = app.create_session("Bob", "bob@example.com").await;
    let (workspace_id, invite_code) = app.create_workspace(&alice_token, "Acme").await;
    app.join_workspace(&bob_token, &invite_code).await;

    let mut alice_ws = connect_ws(&app.ws_url(&alice_token)).await;
    send_join(&mut alice_ws, workspace_id).await;
    wait_for_event(&mut alice_ws, "room_users").await;

    let mut bob_ws = connect_ws(&app.ws_url(&bob_token)).await;
    send_join(&mut bob_ws, workspace_id).await;
    wait_for_event(&mut bob_ws, "room_users").await;

    // Bob 刷新输入中状态，Alice 收到 typing 事件
    let event = json!({ "type": "typing", "workspace_id": workspace_id });
    bob_ws
        .send(Message::Text(event.to_string().into()))
        .await
        .expect("send typing");

    let event = wait_for_event(&mut alice_ws, "typing").await;
    assert_eq!(event["user_id"], bob_id.to_string());
}
