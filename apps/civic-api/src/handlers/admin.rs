//! 管理端状态
//!
//! - GET /admin/status（需登录）

use api_contract::{ApiResponse, ServiceStatusDto};
use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::Principal;

use crate::AppState;
use crate::utils::response::auth_error;

pub async fn admin_status(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
) -> Response {
    if principal.is_none() {
        return auth_error(StatusCode::UNAUTHORIZED);
    }

    let access_log = &state.access_log;
    let api_log_pending = match &access_log.buffer {
        Some(buffer) => buffer.pending().await,
        None => 0,
    };
    let status = ServiceStatusDto {
        api_log_enabled: access_log.buffer.is_some() && !access_log.config.logging_disabled,
        api_log_pending,
    };
    (StatusCode::OK, Json(ApiResponse::success(status))).into_response()
}
