use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use application::{
    dto::{DocumentDto, MessageDto, ParticipantDto, PresenceUserDto, UserRefDto, WorkspaceDto},
    services::{
        CreateDocumentRequest, CreateWorkspaceRequest, EnsureUserRequest, JoinWorkspaceRequest,
        PostMessageRequest, UpdateDocumentRequest,
    },
};
use domain::WorkspaceId;

use crate::{auth::SessionResponse, error::ApiError, state::AppState, websocket};

#[derive(Debug, Deserialize)]
struct SessionPayload {
    display_name: String,
    email: String,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateWorkspacePayload {
    name: String,
}

#[derive(Debug, Deserialize)]
struct JoinWorkspacePayload {
    invite_code: String,
}

#[derive(Debug, Deserialize)]
struct PostMessagePayload {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateDocumentPayload {
    title: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct UpdateDocumentPayload {
    title: String,
    content: String,
    expected_version: Option<i64>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/session", post(create_session))
        .route("/collab", post(create_workspace))
        .route("/collab/join", post(join_workspace))
        .route("/collab/{workspace_id}", axum::routing::delete(delete_workspace))
        .route(
            "/collab/{workspace_id}/chat",
            get(get_chat).post(post_chat),
        )
        .route(
            "/collab/{workspace_id}/documents",
            get(list_documents).post(create_document),
        )
        .route(
            "/collab/{workspace_id}/documents/{document_id}",
            get(get_document).put(update_document).delete(delete_document),
        )
        .route("/collab/{workspace_id}/online", get(get_online))
        .route("/ws", get(websocket::websocket_upgrade))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// 外部身份提供方的边界端点：upsert 目录用户并签发会话令牌
async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<SessionPayload>,
) -> Result<Json<SessionResponse>, ApiError> {
    let user = state
        .user_service
        .ensure_user(EnsureUserRequest {
            display_name: payload.display_name,
            email: payload.email,
            avatar_url: payload.avatar_url,
        })
        .await?;

    let token = state.jwt_service.generate_token(Uuid::from(user.id))?;
    Ok(Json(SessionResponse {
        user: UserRefDto::from(&user),
        token,
    }))
}

async fn create_workspace(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateWorkspacePayload>,
) -> Result<(StatusCode, Json<WorkspaceDto>), ApiError> {
    let caller_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let dto = state
        .workspace_service
        .create_workspace(CreateWorkspaceRequest {
            name: payload.name,
            creator_id: caller_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(dto)))
}

async fn join_workspace(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<JoinWorkspacePayload>,
) -> Result<Json<ParticipantDto>, ApiError> {
    let caller_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let dto = state
        .workspace_service
        .join_workspace(JoinWorkspaceRequest {
            invite_code: payload.invite_code,
            user_id: caller_id,
        })
        .await?;

    Ok(Json(dto))
}

async fn delete_workspace(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(workspace_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let caller_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state
        .workspace_service
        .delete_workspace(workspace_id, caller_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn get_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let caller_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let items = state
        .chat_service
        .list_messages(workspace_id, caller_id)
        .await?;

    Ok(Json(items))
}

async fn post_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(workspace_id): Path<Uuid>,
    Json(payload): Json<PostMessagePayload>,
) -> Result<(StatusCode, Json<MessageDto>), ApiError> {
    let caller_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let content = payload
        .content
        .ok_or_else(|| ApiError::bad_request("content is required"))?;

    let dto = state
        .chat_service
        .post_message(PostMessageRequest {
            workspace_id,
            sender_id: caller_id,
            content,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(dto)))
}

async fn create_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(workspace_id): Path<Uuid>,
    Json(payload): Json<CreateDocumentPayload>,
) -> Result<(StatusCode, Json<DocumentDto>), ApiError> {
    let caller_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let dto = state
        .document_service
        .create(CreateDocumentRequest {
            workspace_id,
            caller_id,
            title: payload.title,
            content: payload.content,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(dto)))
}

async fn list_documents(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<Vec<DocumentDto>>, ApiError> {
    let caller_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let items = state.document_service.list(workspace_id, caller_id).await?;
    Ok(Json(items))
}

async fn get_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((workspace_id, document_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<DocumentDto>, ApiError> {
    let caller_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let dto = state
        .document_service
        .get(workspace_id, document_id, caller_id)
        .await?;

    Ok(Json(dto))
}

async fn update_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((workspace_id, document_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateDocumentPayload>,
) -> Result<Json<DocumentDto>, ApiError> {
    let caller_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let dto = state
        .document_service
        .update(UpdateDocumentRequest {
            workspace_id,
            document_id,
            caller_id,
            title: payload.title,
            content: payload.content,
            expected_version: payload.expected_version,
        })
        .await?;

    Ok(Json(dto))
}

async fn delete_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((workspace_id, document_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let caller_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state
        .document_service
        .remove(workspace_id, document_id, caller_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn get_online(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<Vec<PresenceUserDto>>, ApiError> {
    let caller_id = state.jwt_service.extract_user_from_headers(&headers)?;
    // 在线列表同样只对成员可见
    state
        .workspace_service
        .get_workspace(workspace_id, caller_id)
        .await?;

    let users = state
        .presence
        .list_room(WorkspaceId::from(workspace_id))
        .await;
    Ok(Json(users))
}
