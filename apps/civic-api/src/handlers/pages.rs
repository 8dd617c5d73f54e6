//! 只读页面与回显接口
//!
//! - GET /api/pages/:slug：静态页面内容，通常配置为免记录路由
//! - POST /api/echo：原样返回收到的 JSON，用于验证拦截器不改动请求体

use api_contract::{ApiResponse, PageDto};
use axum::{
    Json,
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;

pub async fn get_page(Path(slug): Path<String>) -> Response {
    let title = slug
        .split('-')
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");
    (
        StatusCode::OK,
        Json(ApiResponse::success(PageDto { slug, title })),
    )
        .into_response()
}

pub async fn echo(Json(body): Json<Value>) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(body))).into_response()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
