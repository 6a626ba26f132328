pub mod repositories;

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

pub type DbPool = sqlx::PgPool;

/// 挂起的下游存储调用不允许无限期挂住逻辑操作
const STATEMENT_TIMEOUT: &str = "5s";
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// 创建 PostgreSQL 连接池
pub async fn create_pg_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<DbPool, sqlx::Error> {
    let options = PgConnectOptions::from_str(database_url)?
        .options([("statement_timeout", STATEMENT_TIMEOUT)]);

    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await
}
