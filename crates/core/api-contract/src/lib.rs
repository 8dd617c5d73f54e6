//! 稳定的 DTO 与 API 响应契约。

use serde::{Deserialize, Serialize};

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 静态页面内容（示例只读接口）。
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDto {
    pub slug: String,
    pub title: String,
}

/// 服务状态（管理端）。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatusDto {
    pub api_log_enabled: bool,
    pub api_log_pending: usize,
}

/// 访问日志链路指标快照。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub logs_enqueued: u64,
    pub logs_skipped: u64,
    pub dropped_unavailable: u64,
    pub flushes: u64,
    pub capacity_flushes: u64,
    pub records_written: u64,
    pub write_failure: u64,
    pub write_timeout: u64,
    pub write_latency_ms_total: u64,
    pub write_latency_ms_count: u64,
}
