//! 认证中间件
//!
//! 携带有效 Bearer token 的请求会在扩展中注入 [`Principal`]；
//! 缺失或无效的 token 不拒绝请求，按匿名处理。是否要求登录由 handler 决定。

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use civic_auth::JwtManager;
use std::sync::Arc;
use tracing::debug;

pub async fn authenticate(
    State(jwt): State<Arc<JwtManager>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let principal = bearer_token(req.headers()).and_then(|token| {
        jwt.decode_access(token)
            .inspect_err(|err| {
                debug!(target: "civic.http", error = %err, "access_token_rejected");
            })
            .ok()
    });
    if let Some(principal) = principal {
        req.extensions_mut().insert(principal);
    }
    next.run(req).await
}

/// 从请求头中提取 Bearer token
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty())
}
