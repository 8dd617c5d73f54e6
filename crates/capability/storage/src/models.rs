//! 数据模型
//!
//! - StoredApiLog：已落库的访问日志行
//! - UserRecord：被日志引用的用户

use domain::ApiLogRecord;

/// 已落库的访问日志行。
#[derive(Debug, Clone)]
pub struct StoredApiLog {
    pub log_id: i64,
    pub record: ApiLogRecord,
    /// 写入时间（毫秒时间戳），由存储层分配。
    pub created_at_ms: i64,
}

/// 用户记录（仅保留日志引用所需字段）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: String,
    pub username: String,
}
