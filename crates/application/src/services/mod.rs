mod chat_service;
mod document_service;
mod user_service;
mod workspace_service;

#[cfg(test)]
mod chat_service_tests;

pub use chat_service::{
    ChatService, ChatServiceDependencies, PostMessageRequest, MESSAGE_HISTORY_LIMIT,
};
pub use document_service::{
    CreateDocumentRequest, DocumentService, DocumentServiceDependencies, UpdateDocumentRequest,
};
pub use user_service::{EnsureUserRequest, UserService, UserServiceDependencies};
pub use workspace_service::{
    CreateWorkspaceRequest, JoinWorkspaceRequest, WorkspaceService, WorkspaceServiceDependencies,
};
