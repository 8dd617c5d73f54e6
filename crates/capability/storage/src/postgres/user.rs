//! Postgres 用户存储实现
//!
//! 删除用户依赖 `api_logs.user_id` 外键的 `on delete set null`。

use crate::error::StorageError;
use crate::models::UserRecord;
use crate::traits::UserStore;
use sqlx::PgPool;

pub struct PgUserStore {
    pub pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 通过数据库 URL 建立连接池
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = crate::connection::connect_pool(database_url).await?;
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl UserStore for PgUserStore {
    async fn create_user(&self, record: UserRecord) -> Result<UserRecord, StorageError> {
        sqlx::query("insert into users (user_id, username) values ($1, $2)")
            .bind(&record.user_id)
            .bind(&record.username)
            .execute(&self.pool)
            .await?;
        Ok(record)
    }

    async fn delete_user(&self, user_id: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("delete from users where user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
