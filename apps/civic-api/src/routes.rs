//! 路由定义
//!
//! 路由包括：
//! - 健康检查：/health
//! - 指标：/metrics
//! - 页面与回显：/api/pages/:slug, /api/echo
//! - 管理端：/admin/status
//! - 媒体文件：/media/*path
//!
//! 中间件顺序（外 -> 内）：request_context -> authenticate -> access_log。
//! 拦截器挂在 Router 上，因此能读到 `MatchedPath` 与认证注入的 `Principal`。

use crate::AppState;
use crate::handlers::*;
use crate::middleware::{access_log, authenticate, request_context};
use axum::{
    Router, middleware,
    routing::{get, post},
};

/// 创建应用路由
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .route("/api/pages/:slug", get(get_page))
        .route("/api/echo", post(echo))
        .route("/admin/status", get(admin_status))
        .route("/media/*path", get(media_file))
        .layer(middleware::from_fn_with_state(
            state.access_log.clone(),
            access_log,
        ))
        .layer(middleware::from_fn_with_state(
            state.jwt.clone(),
            authenticate,
        ))
        .layer(middleware::from_fn(request_context))
        .with_state(state)
}
