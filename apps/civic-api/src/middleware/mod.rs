//! 中间件
//!
//! - request_context：注入 request_id/trace_id
//! - authenticate：解析 Bearer token，注入请求主体
//! - access_log：访问日志拦截器

pub mod access_log;
pub mod auth;
pub mod request_context;

pub use access_log::access_log;
pub use auth::{authenticate, bearer_token};
pub use request_context::request_context;
