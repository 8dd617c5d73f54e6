//! 内存存储实现模块
//!
//! 用于本地运行和测试（未配置数据库时由启动流程选用）。
//!
//! 包含以下实现：
//! - ApiLogStore: InMemoryApiLogStore
//! - UserStore: InMemoryUserStore

pub mod api_log;
pub mod user;

pub use api_log::*;
pub use user::*;
