//! 请求上下文中间件：为每个请求分配 request_id/trace_id。
//!
//! ID 写入请求扩展与 `request` span，并通过 `x-request-id`/`x-trace-id`
//! 响应头回传给调用方。

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use civic_telemetry::new_request_ids;
use tracing::{Instrument, info_span};

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
const TRACE_ID_HEADER: HeaderName = HeaderName::from_static("x-trace-id");

pub async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    let ids = new_request_ids();
    let span = info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        method = %req.method(),
        path = %req.uri().path()
    );
    req.extensions_mut().insert(ids.clone());

    let mut response = next.run(req).instrument(span).await;
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&ids.request_id) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&ids.trace_id) {
        headers.insert(TRACE_ID_HEADER, value);
    }
    response
}
