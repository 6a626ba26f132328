//! 消息管线单元测试
//!
//! 覆盖历史查询、发送校验、授权、提及解析与广播。

use std::sync::Arc;

use chrono::Utc;
use domain::{DomainError, User, UserId};
use uuid::Uuid;

use crate::clock::SystemClock;
use crate::dto::WorkspaceDto;
use crate::error::ApplicationError;
use crate::guard::AccessGuard;
use crate::local_broadcast::LocalRoomBroadcaster;
use crate::memory::{
    MemoryMessageRepository, MemoryParticipantRepository, MemoryStore, MemoryUserRepository,
    MemoryWorkspaceRepository,
};
use crate::protocol::ServerEvent;
use crate::repository::UserRepository;
use crate::services::{
    ChatService, ChatServiceDependencies, CreateWorkspaceRequest, JoinWorkspaceRequest,
    PostMessageRequest, WorkspaceService, WorkspaceServiceDependencies,
};

struct Harness {
    user_repository: Arc<MemoryUserRepository>,
    workspace_service: WorkspaceService,
    chat_service: ChatService,
    broadcaster: Arc<LocalRoomBroadcaster>,
}

fn harness() -> Harness {
    let store = MemoryStore::new();
    let user_repository = Arc::new(MemoryUserRepository::new(store.clone()));
    let workspace_repository = Arc::new(MemoryWorkspaceRepository::new(store.clone()));
    let participant_repository = Arc::new(MemoryParticipantRepository::new(store.clone()));
    let message_repository = Arc::new(MemoryMessageRepository::new(store));
    let guard = Arc::new(AccessGuard::new(
        workspace_repository.clone(),
        participant_repository.clone(),
    ));
    let clock = Arc::new(SystemClock);
    let broadcaster = Arc::new(LocalRoomBroadcaster::new(64));

    let workspace_service = WorkspaceService::new(WorkspaceServiceDependencies {
        workspace_repository,
        participant_repository,
        user_repository: user_repository.clone(),
        guard: guard.clone(),
        clock: clock.clone(),
    });
    let chat_service = ChatService::new(ChatServiceDependencies {
        guard,
        user_repository: user_repository.clone(),
        message_repository,
        clock,
        broadcaster: broadcaster.clone(),
    });

    Harness {
        user_repository,
        workspace_service,
        chat_service,
        broadcaster,
    }
}

impl Harness {
    async fn seed_user(&self, name: &str, email: &str) -> User {
        let user = User::new(
            UserId::from(Uuid::new_v4()),
            name,
            email,
            None,
            Utc::now(),
        )
        .unwrap();
        self.user_repository.create(user).await.unwrap()
    }

    async fn seed_workspace(&self, creator: &User) -> WorkspaceDto {
        self.workspace_service
            .create_workspace(CreateWorkspaceRequest {
                name: "Acme".to_string(),
                creator_id: Uuid::from(creator.id),
            })
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_history_is_empty_before_first_post() {
    let harness = harness();
    let alice = harness.seed_user("Alice", "alice@example.com").await;
    let workspace = harness.seed_workspace(&alice).await;

    let messages = harness
        .chat_service
        .list_messages(workspace.id, Uuid::from(alice.id))
        .await
        .unwrap();
    assert!(messages.is_empty());
}

#[tokio::test]
async fn test_post_then_list_round_trip() {
    let harness = harness();
    let alice = harness.seed_user("Alice", "alice@example.com").await;
    let workspace = harness.seed_workspace(&alice).await;

    harness
        .chat_service
        .post_message(PostMessageRequest {
            workspace_id: workspace.id,
            sender_id: Uuid::from(alice.id),
            content: "hello team".to_string(),
        })
        .await
        .unwrap();

    let messages = harness
        .chat_service
        .list_messages(workspace.id, Uuid::from(alice.id))
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    let last = messages.last().unwrap();
    assert_eq!(last.content, "hello team");
    assert!(last.mentions.is_empty());
    assert_eq!(last.sender.display_name, "Alice");
}

#[tokio::test]
async fn test_empty_content_is_rejected_without_side_effects() {
    let harness = harness();
    let alice = harness.seed_user("Alice", "alice@example.com").await;
    let workspace = harness.seed_workspace(&alice).await;

    for content in ["", "   "] {
        let result = harness
            .chat_service
            .post_message(PostMessageRequest {
                workspace_id: workspace.id,
                sender_id: Uuid::from(alice.id),
                content: content.to_string(),
            })
            .await;
        assert!(matches!(
            result,
            Err(ApplicationError::Domain(DomainError::InvalidArgument { .. }))
        ));
    }

    let messages = harness
        .chat_service
        .list_messages(workspace.id, Uuid::from(alice.id))
        .await
        .unwrap();
    assert!(messages.is_empty());
}

#[tokio::test]
async fn test_non_member_cannot_post_or_list() {
    let harness = harness();
    let alice = harness.seed_user("Alice", "alice@example.com").await;
    let mallory = harness.seed_user("Mallory", "mallory@example.com").await;
    let workspace = harness.seed_workspace(&alice).await;

    let post = harness
        .chat_service
        .post_message(PostMessageRequest {
            workspace_id: workspace.id,
            sender_id: Uuid::from(mallory.id),
            content: "let me in".to_string(),
        })
        .await;
    assert!(matches!(
        post,
        Err(ApplicationError::Domain(DomainError::NotAMember))
    ));

    let list = harness
        .chat_service
        .list_messages(workspace.id, Uuid::from(mallory.id))
        .await;
    assert!(matches!(
        list,
        Err(ApplicationError::Domain(DomainError::NotAMember))
    ));
}

#[tokio::test]
async fn test_mention_resolution_end_to_end() {
    // 规格场景：Alice 建立 Acme，Bob 兑换邀请码，
    // Alice 发送 "@Bob check this out"
    let harness = harness();
    let alice = harness.seed_user("Alice", "alice@example.com").await;
    let bob = harness.seed_user("Bob", "bob@example.com").await;
    let workspace = harness.seed_workspace(&alice).await;

    let membership = harness
        .workspace_service
        .join_workspace(JoinWorkspaceRequest {
            invite_code: workspace.invite_code.clone(),
            user_id: Uuid::from(bob.id),
        })
        .await
        .unwrap();
    assert_eq!(membership.user_id, Uuid::from(bob.id));

    harness
        .chat_service
        .post_message(PostMessageRequest {
            workspace_id: workspace.id,
            sender_id: Uuid::from(alice.id),
            content: "@Bob check this out".to_string(),
        })
        .await
        .unwrap();

    let messages = harness
        .chat_service
        .list_messages(workspace.id, Uuid::from(alice.id))
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    let message = &messages[0];
    assert_eq!(message.content, "@Bob check this out");
    let mention_ids: Vec<Uuid> = message.mentions.iter().map(|m| m.id).collect();
    assert_eq!(mention_ids, vec![Uuid::from(bob.id)]);
}

#[tokio::test]
async fn test_unresolved_mentions_are_silently_dropped() {
    let harness = harness();
    let alice = harness.seed_user("Alice", "alice@example.com").await;
    let workspace = harness.seed_workspace(&alice).await;

    let message = harness
        .chat_service
        .post_message(PostMessageRequest {
            workspace_id: workspace.id,
            sender_id: Uuid::from(alice.id),
            content: "@Nobody are you there".to_string(),
        })
        .await
        .unwrap();

    assert!(message.mentions.is_empty());
    assert_eq!(message.content, "@Nobody are you there");
}

#[tokio::test]
async fn test_ambiguous_mention_resolves_to_all_matches() {
    let harness = harness();
    let alice = harness.seed_user("Alice", "alice@example.com").await;
    let bob1 = harness.seed_user("Bob", "bob1@example.com").await;
    let bob2 = harness.seed_user("Bob", "bob2@example.com").await;
    let workspace = harness.seed_workspace(&alice).await;

    let message = harness
        .chat_service
        .post_message(PostMessageRequest {
            workspace_id: workspace.id,
            sender_id: Uuid::from(alice.id),
            content: "@Bob ping".to_string(),
        })
        .await
        .unwrap();

    let mut mention_ids: Vec<Uuid> = message.mentions.iter().map(|m| m.id).collect();
    mention_ids.sort();
    let mut expected = vec![Uuid::from(bob1.id), Uuid::from(bob2.id)];
    expected.sort();
    assert_eq!(mention_ids, expected);
}

#[tokio::test]
async fn test_sender_snapshot_survives_directory_changes() {
    let harness = harness();
    let alice = harness.seed_user("Alice", "alice@example.com").await;
    let workspace = harness.seed_workspace(&alice).await;

    harness
        .chat_service
        .post_message(PostMessageRequest {
            workspace_id: workspace.id,
            sender_id: Uuid::from(alice.id),
            content: "before rename".to_string(),
        })
        .await
        .unwrap();

    // 目录里改名不影响已发送消息的快照
    let renamed = User::new(
        alice.id,
        "Alicia",
        "alice@example.com",
        None,
        alice.created_at,
    )
    .unwrap();
    harness.user_repository.update(renamed).await.unwrap();

    let messages = harness
        .chat_service
        .list_messages(workspace.id, Uuid::from(alice.id))
        .await
        .unwrap();
    assert_eq!(messages[0].sender.display_name, "Alice");
}

#[tokio::test]
async fn test_post_broadcasts_expanded_message() {
    let harness = harness();
    let alice = harness.seed_user("Alice", "alice@example.com").await;
    let bob = harness.seed_user("Bob", "bob@example.com").await;
    let workspace = harness.seed_workspace(&alice).await;
    harness
        .workspace_service
        .join_workspace(JoinWorkspaceRequest {
            invite_code: workspace.invite_code.clone(),
            user_id: Uuid::from(bob.id),
        })
        .await
        .unwrap();

    let mut stream = harness
        .broadcaster
        .subscribe(domain::WorkspaceId::from(workspace.id));

    harness
        .chat_service
        .post_message(PostMessageRequest {
            workspace_id: workspace.id,
            sender_id: Uuid::from(alice.id),
            content: "@Bob look".to_string(),
        })
        .await
        .unwrap();

    match stream.recv().await {
        Some(ServerEvent::NewMessage { message }) => {
            assert_eq!(message.content, "@Bob look");
            assert_eq!(message.mentions.len(), 1);
            assert_eq!(message.mentions[0].id, Uuid::from(bob.id));
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_messages_are_listed_in_send_order() {
    let harness = harness();
    let alice = harness.seed_user("Alice", "alice@example.com").await;
    let workspace = harness.seed_workspace(&alice).await;

    for content in ["first", "second", "third"] {
        harness
            .chat_service
            .post_message(PostMessageRequest {
                workspace_id: workspace.id,
                sender_id: Uuid::from(alice.id),
                content: content.to_string(),
            })
            .await
            .unwrap();
    }

    let messages = harness
        .chat_service
        .list_messages(workspace.id, Uuid::from(alice.id))
        .await
        .unwrap();
    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second", "third"]);
}
