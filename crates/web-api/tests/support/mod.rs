//! 集成测试支撑：用内存存储组装完整的路由和服务器

use std::net::SocketAddr;
use std::sync::Arc;

use application::{
    memory::{
        MemoryDocumentRepository, MemoryMessageRepository, MemoryParticipantRepository,
        MemoryStore, MemoryUserRepository, MemoryWorkspaceRepository,
    },
    AccessGuard, ChatService, ChatServiceDependencies, Clock, DocumentService,
    DocumentServiceDependencies, LocalRoomBroadcaster, PresenceRegistry, RoomBroadcaster,
    RoomSessionTable, SystemClock, UserService, UserServiceDependencies, WorkspaceService,
    WorkspaceServiceDependencies,
};
use axum::Router;
use serde_json::json;
use tokio::sync::oneshot;
use uuid::Uuid;
use web_api::{router, AppState, JwtConfig, JwtService};

pub fn build_router() -> Router {
    let store = MemoryStore::new();
    let user_repository = Arc::new(MemoryUserRepository::new(store.clone()));
    let workspace_repository = Arc::new(MemoryWorkspaceRepository::new(store.clone()));
    let participant_repository = Arc::new(MemoryParticipantRepository::new(store.clone()));
    let message_repository = Arc::new(MemoryMessageRepository::new(store.clone()));
    let document_repository = Arc::new(MemoryDocumentRepository::new(store));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let broadcaster = Arc::new(LocalRoomBroadcaster::new(256));
    let guard = Arc::new(AccessGuard::new(
        workspace_repository.clone(),
        participant_repository.clone(),
    ));
    let presence = Arc::new(PresenceRegistry::new(
        broadcaster.clone() as Arc<dyn RoomBroadcaster>
    ));
    let sessions = Arc::new(RoomSessionTable::new());

    let user_service = UserService::new(UserServiceDependencies {
        user_repository: user_repository.clone(),
        clock: clock.clone(),
    });
    let workspace_service = WorkspaceService::new(WorkspaceServiceDependencies {
        workspace_repository,
        participant_repository,
        user_repository: user_repository.clone(),
        guard: guard.clone(),
        clock: clock.clone(),
    });
    let chat_service = ChatService::new(ChatServiceDependencies {
        guard: guard.clone(),
        user_repository,
        message_repository,
        clock: clock.clone(),
        broadcaster: broadcaster.clone() as Arc<dyn RoomBroadcaster>,
    });
    let document_service = DocumentService::new(DocumentServiceDependencies {
        guard: guard.clone(),
        document_repository,
        clock,
    });

    let jwt_service = Arc::new(JwtService::new(JwtConfig {
        secret: "test-secret-key".to_string(),
        expiration_hours: 24,
    }));

    let state = AppState::new(
        Arc::new(user_service),
        Arc::new(workspace_service),
        Arc::new(chat_service),
        Arc::new(document_service),
        guard,
        presence,
        sessions,
        broadcaster,
        jwt_service,
    );

    router(state)
}

pub struct TestApp {
    pub addr: SocketAddr,
    pub base_url: String,
    pub client: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
}

/// 启动一个绑定随机端口的完整服务器
pub async fn spawn_app() -> TestApp {
    let app = build_router();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    TestApp {
        addr,
        base_url: format!("http://{}", addr),
        client: reqwest::Client::new(),
        shutdown: Some(shutdown_tx),
    }
}

impl TestApp {
    /// 铸造会话：upsert 目录用户并取回令牌
    pub async fn create_session(&self, display_name: &str, email: &str) -> (Uuid, String) {
        let body = self
            .client
            .post(format!("{}/api/v1/auth/session", self.base_url))
            .json(&json!({
                "display_name": display_name,
                "email": email
            }))
            .send()
            .await
            .expect("create session")
            .json::<serde_json::Value>()
            .await
            .expect("session json");

        let user_id = body["user"]["id"]
            .as_str()
            .expect("user id")
            .parse::<Uuid>()
            .expect("uuid");
        let token = body["token"].as_str().expect("token").to_string();
        (user_id, token)
    }

    /// 创建工作区，返回 (workspace_id, invite_code)
    pub async fn create_workspace(&self, token: &str, name: &str) -> (Uuid, String) {
        let body = self
            .client
            .post(format!("{}/api/v1/collab", self.base_url))
            .bearer_auth(token)
            .json(&json!({ "name": name }))
            .send()
            .await
            .expect("create workspace")
            .json::<serde_json::Value>()
            .await
            .expect("workspace json");

        let workspace_id = body["id"]
            .as_str()
            .expect("workspace id")
            .parse::<Uuid>()
            .expect("uuid");
        let invite_code = body["invite_code"].as_str().expect("invite code").to_string();
        (workspace_id, invite_code)
    }

    pub async fn join_workspace(&self, token: &str, invite_code: &str) {
        let response = self
            .client
            .post(format!("{}/api/v1/collab/join", self.base_url))
            .bearer_auth(token)
            .json(&json!({ "invite_code": invite_code }))
            .send()
            .await
            .expect("join workspace");
        assert!(response.status().is_success(), "join failed: {}", response.status());
    }

    pub fn ws_url(&self, token: &str) -> String {
        format!("ws://{}/api/v1/ws?token={}", self.addr, token)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}
