//! 访问日志内存实现

use crate::error::StorageError;
use crate::models::StoredApiLog;
use crate::traits::ApiLogStore;
use domain::ApiLogRecord;
use std::sync::RwLock;

#[derive(Default)]
struct ApiLogState {
    rows: Vec<StoredApiLog>,
    batches: Vec<usize>,
    next_id: i64,
}

/// 访问日志内存存储
///
/// 额外记录每次批量写入的条数，便于验证刷盘行为。
#[derive(Default)]
pub struct InMemoryApiLogStore {
    state: RwLock<ApiLogState>,
}

impl InMemoryApiLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已写入的日志行（按写入顺序）。
    pub fn records(&self) -> Vec<StoredApiLog> {
        self.state
            .read()
            .map(|state| state.rows.clone())
            .unwrap_or_default()
    }

    /// 每次 bulk_insert 的批次大小。
    pub fn batches(&self) -> Vec<usize> {
        self.state
            .read()
            .map(|state| state.batches.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.state.read().map(|state| state.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 将引用指定用户的日志置空，返回受影响行数。
    pub fn detach_user(&self, user_id: &str) -> Result<usize, StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut affected = 0;
        for row in state.rows.iter_mut() {
            if row.record.user_id.as_deref() == Some(user_id) {
                row.record.user_id = None;
                affected += 1;
            }
        }
        Ok(affected)
    }
}

#[async_trait::async_trait]
impl ApiLogStore for InMemoryApiLogStore {
    async fn bulk_insert(&self, records: &[ApiLogRecord]) -> Result<usize, StorageError> {
        if records.is_empty() {
            return Ok(0);
        }
        let created_at_ms = now_epoch_ms();
        let mut state = self
            .state
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        for record in records {
            state.next_id += 1;
            let log_id = state.next_id;
            state.rows.push(StoredApiLog {
                log_id,
                record: record.clone(),
                created_at_ms,
            });
        }
        state.batches.push(records.len());
        Ok(records.len())
    }
}

fn now_epoch_ms() -> i64 {
    let now = std::time::SystemTime::now();
    let duration = now
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_millis() as i64
}
