//! 数据库连接管理
//!
//! - connect_pool：建立 Postgres 连接池
//!
//! 访问日志写入只由后台刷盘任务（以及满载时的请求任务）触发，
//! 连接数不需要很多。

use crate::error::StorageError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// 默认最大连接数。
pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;

/// 建立 Postgres 连接池
///
/// # 参数
/// - `database_url`：Postgres 连接字符串
pub async fn connect_pool(database_url: &str) -> Result<PgPool, StorageError> {
    let pool = PgPoolOptions::new()
        .max_connections(DEFAULT_MAX_CONNECTIONS)
        .connect(database_url)
        .await?;
    Ok(pool)
}
