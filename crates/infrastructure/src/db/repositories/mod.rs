mod document_repository_impl;
mod message_repository_impl;
mod participant_repository_impl;
mod user_repository_impl;
mod workspace_repository_impl;

pub use document_repository_impl::PgDocumentRepository;
pub use message_repository_impl::PgMessageRepository;
pub use participant_repository_impl::PgParticipantRepository;
pub use user_repository_impl::PgUserRepository;
pub use workspace_repository_impl::PgWorkspaceRepository;

use domain::RepositoryError;

/// 统一的 sqlx 错误映射；唯一约束冲突单独归类
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            RepositoryError::Conflict
        }
        _ => RepositoryError::storage_with_source("database error", err),
    }
}
