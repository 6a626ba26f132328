//! 基础设施层
//!
//! PostgreSQL 连接池与各 repository 的 sqlx 实现。
//! 内存实现见 `application::memory`（测试与单进程开发模式共用）。

pub mod db;

pub use db::repositories::{
    PgDocumentRepository, PgMessageRepository, PgParticipantRepository, PgUserRepository,
    PgWorkspaceRepository,
};
pub use db::{create_pg_pool, DbPool};
