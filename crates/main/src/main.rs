//! 主应用程序入口
//!
//! 启动 Axum Web API 服务。

use std::sync::Arc;

use application::{
    AccessGuard, ChatService, ChatServiceDependencies, Clock, DocumentService,
    DocumentServiceDependencies, LocalRoomBroadcaster, PresenceRegistry, RoomBroadcaster,
    RoomSessionTable, SystemClock, UserService, UserServiceDependencies, WorkspaceService,
    WorkspaceServiceDependencies,
};
use config::AppConfig;
use infrastructure::{
    create_pg_pool, PgDocumentRepository, PgMessageRepository, PgParticipantRepository,
    PgUserRepository, PgWorkspaceRepository,
};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env_with_defaults();

    tracing::info!(
        "连接数据库: {}",
        config.database.url.split('@').next_back().unwrap_or("unknown")
    );

    let pg_pool = create_pg_pool(&config.database.url, config.database.max_connections).await?;

    // 运行迁移
    sqlx::migrate!("../../migrations").run(&pg_pool).await?;

    // 创建 repository 实例
    let user_repository = Arc::new(PgUserRepository::new(pg_pool.clone()));
    let workspace_repository = Arc::new(PgWorkspaceRepository::new(pg_pool.clone()));
    let participant_repository = Arc::new(PgParticipantRepository::new(pg_pool.clone()));
    let message_repository = Arc::new(PgMessageRepository::new(pg_pool.clone()));
    let document_repository = Arc::new(PgDocumentRepository::new(pg_pool));

    // 共享组件
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let broadcaster = Arc::new(LocalRoomBroadcaster::new(config.broadcast.capacity));
    let guard = Arc::new(AccessGuard::new(
        workspace_repository.clone(),
        participant_repository.clone(),
    ));
    let presence = Arc::new(PresenceRegistry::new(
        broadcaster.clone() as Arc<dyn RoomBroadcaster>
    ));
    let sessions = Arc::new(RoomSessionTable::new());

    // 应用层服务
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

    let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));

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

    // 启动 Web 服务器
    let app = router(state);
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;

    tracing::info!(
        "协作空间服务器启动在 http://{}:{}",
        config.server.host,
        config.server.port
    );
    axum::serve(listener, app).await?;

    Ok(())
}
