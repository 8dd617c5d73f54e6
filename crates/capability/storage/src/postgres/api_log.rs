//! Postgres 访问日志实现

use crate::error::StorageError;
use crate::traits::ApiLogStore;
use domain::ApiLogRecord;
use sqlx::{PgPool, Postgres, QueryBuilder};

/// 单条 insert 语句的最大行数（7 个参数/行，低于 65535 上限）。
pub const INSERT_CHUNK_ROWS: usize = 1000;

pub struct PgApiLogStore {
    pub pool: PgPool,
}

impl PgApiLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = crate::connection::connect_pool(database_url).await?;
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl ApiLogStore for PgApiLogStore {
    async fn bulk_insert(&self, records: &[ApiLogRecord]) -> Result<usize, StorageError> {
        if records.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        for chunk in records.chunks(INSERT_CHUNK_ROWS) {
            let rows = encode_rows(chunk)?;
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "insert into api_logs \
                 (path, user_id, body, method, ip_address, status_code, execution_time) ",
            );
            builder.push_values(rows, |mut row, item| {
                // 引用不存在的用户时写入 null，避免整批因外键失败
                row.push_bind(item.path)
                    .push("(select user_id from users where user_id = ")
                    .push_bind_unseparated(item.user_id)
                    .push_unseparated(")")
                    .push_bind(item.body)
                    .push_unseparated("::jsonb")
                    .push_bind(item.method)
                    .push_bind(item.ip_address)
                    .push_bind(item.status_code)
                    .push_bind(item.execution_time)
                    .push_unseparated("::numeric(8, 5)");
            });
            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(records.len())
    }
}

/// 绑定前的行值。
struct EncodedRow {
    path: String,
    user_id: Option<String>,
    body: String,
    method: String,
    ip_address: String,
    status_code: i32,
    execution_time: String,
}

fn encode_rows(records: &[ApiLogRecord]) -> Result<Vec<EncodedRow>, StorageError> {
    records
        .iter()
        .map(|record| {
            Ok(EncodedRow {
                path: record.path.clone(),
                user_id: record.user_id.clone(),
                body: serde_json::to_string(&record.body.to_json())?,
                method: record.method.clone(),
                ip_address: record.ip_address.clone(),
                status_code: i32::from(record.status_code),
                execution_time: record.execution_time.to_string(),
            })
        })
        .collect()
}
