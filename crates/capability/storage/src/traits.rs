//! 存储接口 Trait 定义
//!
//! - ApiLogStore：访问日志批量写入
//! - UserStore：用户增删（删除时日志引用置空）
//!
//! 设计原则：
//! - 所有接口返回 StorageError
//! - 使用 async_trait 支持动态分发

use crate::error::StorageError;
use crate::models::UserRecord;
use async_trait::async_trait;
use domain::ApiLogRecord;

/// 访问日志存储接口
///
/// 只有批量写入，没有读取路径。
#[async_trait]
pub trait ApiLogStore: Send + Sync {
    /// 一次性写入一批日志，返回写入条数。
    ///
    /// `created_at` 在写入时分配；空批次直接返回 0。
    async fn bulk_insert(&self, records: &[ApiLogRecord]) -> Result<usize, StorageError>;
}

/// 用户存储接口
#[async_trait]
pub trait UserStore: Send + Sync {
    /// 创建用户
    async fn create_user(&self, record: UserRecord) -> Result<UserRecord, StorageError>;

    /// 删除用户
    ///
    /// 引用该用户的访问日志保留，`user_id` 置空。
    async fn delete_user(&self, user_id: &str) -> Result<bool, StorageError>;
}
