use std::sync::Arc;

use application::{
    AccessGuard, ChatService, DocumentService, LocalRoomBroadcaster, PresenceRegistry,
    RoomSessionTable, UserService, WorkspaceService,
};

use crate::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub workspace_service: Arc<WorkspaceService>,
    pub chat_service: Arc<ChatService>,
    pub document_service: Arc<DocumentService>,
    pub guard: Arc<AccessGuard>,
    pub presence: Arc<PresenceRegistry>,
    pub sessions: Arc<RoomSessionTable>,
    pub broadcaster: Arc<LocalRoomBroadcaster>,
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_service: Arc<UserService>,
        workspace_service: Arc<WorkspaceService>,
        chat_service: Arc<ChatService>,
        document_service: Arc<DocumentService>,
        guard: Arc<AccessGuard>,
        presence: Arc<PresenceRegistry>,
        sessions: Arc<RoomSessionTable>,
        broadcaster: Arc<LocalRoomBroadcaster>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            user_service,
            workspace_service,
            chat_service,
            document_service,
            guard,
            presence,
            sessions,
            broadcaster,
            jwt_service,
        }
    }
}
