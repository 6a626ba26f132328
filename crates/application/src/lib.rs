//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务，处理输入校验、授权关卡、
//! 在线状态登记、会话表，以及对外部适配器（存储、消息广播）的抽象。

pub mod broadcaster;
pub mod clock;
pub mod dto;
pub mod error;
pub mod guard;
pub mod local_broadcast;
pub mod memory;
pub mod presence;
pub mod protocol;
pub mod repository;
pub mod services;
pub mod session;

pub use broadcaster::{BroadcastError, RoomBroadcast, RoomBroadcaster};
pub use clock::{Clock, SystemClock};
pub use dto::{DocumentDto, MessageDto, ParticipantDto, PresenceUserDto, UserRefDto, WorkspaceDto};
pub use error::ApplicationError;
pub use guard::AccessGuard;
pub use local_broadcast::{LocalRoomBroadcaster, RoomEventStream};
pub use memory::MemoryStore;
pub use presence::{PresenceEntry, PresenceRegistry, TYPING_TTL};
pub use protocol::{ClientEvent, ServerEvent};
pub use repository::{
    DocumentPatch, DocumentRepository, MessageRepository, ParticipantRepository, UserRepository,
    WorkspaceRepository,
};
pub use services::{
    ChatService, ChatServiceDependencies, DocumentService, DocumentServiceDependencies,
    UserService, UserServiceDependencies, WorkspaceService, WorkspaceServiceDependencies,
};
pub use session::{RoomSessionTable, SessionAttach};
