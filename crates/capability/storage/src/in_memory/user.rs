//! 用户内存存储实现
//!
//! 与 InMemoryApiLogStore 共享数据，模拟外键 `on delete set null`。

use crate::error::StorageError;
use crate::in_memory::InMemoryApiLogStore;
use crate::models::UserRecord;
use crate::traits::UserStore;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// 用户内存存储
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
    api_logs: Arc<InMemoryApiLogStore>,
}

impl InMemoryUserStore {
    pub fn new(api_logs: Arc<InMemoryApiLogStore>) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            api_logs,
        }
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryUserStore {
    async fn create_user(&self, record: UserRecord) -> Result<UserRecord, StorageError> {
        let mut users = self
            .users
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        if users.contains_key(&record.user_id) {
            return Err(StorageError::new("user already exists"));
        }
        users.insert(record.user_id.clone(), record.clone());
        Ok(record)
    }

    async fn delete_user(&self, user_id: &str) -> Result<bool, StorageError> {
        let removed = self
            .users
            .write()
            .map_err(|_| StorageError::new("lock failed"))?
            .remove(user_id)
            .is_some();
        if removed {
            self.api_logs.detach_user(user_id)?;
        }
        Ok(removed)
    }
}
