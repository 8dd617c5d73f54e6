//! # PostgreSQL 存储实现模块
//!
//! 生产环境使用的访问日志与用户存储。
//!
//! ## 数据库模式要求
//!
//! 见仓库根目录 `migrations/0001_api_logs.sql`：
//! - `users`：用户表（user_id, username）
//! - `api_logs`：访问日志表，`user_id` 外键 `on delete set null`，
//!   `created_at default now()`，并建立 `created_at` 索引
//!
//! ## 写入策略
//!
//! - 一批日志在一个事务内通过多行 `insert ... values` 写入
//! - 每条语句最多 [`api_log::INSERT_CHUNK_ROWS`] 行，避免超过参数上限
//! - 所有值使用参数绑定，禁止字符串拼接

pub mod api_log;
pub mod user;

pub use api_log::*;
pub use user::*;
