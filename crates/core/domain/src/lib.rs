pub mod data;

pub use data::{ApiLogRecord, ExecutionTime, RequestBody};

/// 请求主体：经认证中间件解析后注入请求扩展。
///
/// 匿名请求不会携带该扩展，访问日志中的 `user_id` 即为空。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
}

impl Principal {
    /// 构造已认证的请求主体。
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}
