//! civic HTTP 服务：路由、中间件与访问日志链路装配。
//!
//! 请求依次经过 `request_context`（追踪 ID）、`authenticate`（可选 JWT）、
//! `access_log`（访问日志拦截器）后进入 handler。

pub mod bootstrap;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod utils;

use civic_auth::JwtManager;
use civic_config::ApiLogConfig;
use civic_pipeline::LogBuffer;
use std::sync::Arc;

/// 应用共享状态。
#[derive(Clone)]
pub struct AppState {
    pub jwt: Arc<JwtManager>,
    pub access_log: AccessLogState,
}

/// 访问日志拦截器状态。
///
/// `buffer` 为 `None` 时拦截器照常放行请求，但不入队任何记录。
#[derive(Clone)]
pub struct AccessLogState {
    pub buffer: Option<LogBuffer>,
    pub config: Arc<ApiLogConfig>,
}

impl AccessLogState {
    pub fn new(buffer: Option<LogBuffer>, config: ApiLogConfig) -> Self {
        Self {
            buffer,
            config: Arc::new(config),
        }
    }
}
