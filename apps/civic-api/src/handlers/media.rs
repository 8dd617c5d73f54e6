use axum::{extract::Path, response::Response};
use tracing::debug;

use crate::utils::response::not_found_error;

/// 媒体文件占位：静态文件由前置代理提供，这里一律 404。
pub async fn media_file(Path(path): Path<String>) -> Response {
    debug!(target: "civic.http", path = %path, "media_not_served");
    not_found_error()
}
