pub mod document;
pub mod message;
pub mod participant;
pub mod user;
pub mod workspace;

pub use document::Document;
pub use message::{Message, SenderSnapshot};
pub use participant::{Participant, ParticipantRole};
pub use user::User;
pub use workspace::Workspace;
