//! 访问日志链路指标快照。
//!
//! - GET /metrics（需登录）

use api_contract::{ApiResponse, MetricsSnapshotDto};
use axum::{
    Extension, Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use civic_telemetry::metrics;
use domain::Principal;

use crate::utils::response::auth_error;

pub async fn get_metrics(principal: Option<Extension<Principal>>) -> Response {
    if principal.is_none() {
        return auth_error(StatusCode::UNAUTHORIZED);
    }

    let snapshot = metrics().snapshot();
    (
        StatusCode::OK,
        Json(ApiResponse::success(MetricsSnapshotDto {
            logs_enqueued: snapshot.logs_enqueued,
            logs_skipped: snapshot.logs_skipped,
            dropped_unavailable: snapshot.dropped_unavailable,
            flushes: snapshot.flushes,
            capacity_flushes: snapshot.capacity_flushes,
            records_written: snapshot.records_written,
            write_failure: snapshot.write_failure,
            write_timeout: snapshot.write_timeout,
            write_latency_ms_total: snapshot.write_latency_ms_total,
            write_latency_ms_count: snapshot.write_latency_ms_count,
        })),
    )
        .into_response()
}
