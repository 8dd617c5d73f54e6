//! 认证能力：JWT access token 签发与校验。
//!
//! 访问日志只需要知道请求主体是谁；登录、权限等流程不在本 crate 范围内。

mod jwt;

pub use jwt::JwtManager;

/// 认证相关错误。
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token expired")]
    TokenExpired,
    #[error("token invalid")]
    TokenInvalid,
    #[error("internal error: {0}")]
    Internal(String),
}
