//! 访问日志拦截器
//!
//! 对每个未被豁免的请求：缓存请求体、计时、调用下游、解析请求体、
//! 解析客户端 IP 与请求主体、脱敏后组装 [`ApiLogRecord`] 并入队。
//! 拦截器从不自行构造响应，下游响应原样返回。
//!
//! 豁免规则（直接放行，不产生记录）：
//! - 全局开关关闭
//! - 路径以媒体前缀开头
//! - 路径位于管理后台前缀下
//! - 匹配到的路由模板与方法在免记录表中

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, MatchedPath, Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use civic_config::ApiLogConfig;
use civic_redact::redact;
use civic_telemetry::{record_dropped_unavailable, record_log_skipped};
use domain::{ApiLogRecord, ExecutionTime, Principal, RequestBody};
use futures::{StreamExt, stream};
use http_body_util::BodyExt;
use serde_json::{Map, Value};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{debug, warn};

use crate::AccessLogState;

/// 请求体既不是 JSON 也不是表单时的占位说明。
pub const UNDECODABLE_BODY: &str = "<request body is not JSON or form-encoded>";
/// 请求体超过捕获上限时的占位说明。
pub const OVERSIZED_BODY: &str = "<request body exceeds capture limit>";

pub async fn access_log(
    State(state): State<AccessLogState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string());
    if should_skip(
        &state.config,
        req.uri().path(),
        route.as_deref(),
        req.method().as_str(),
    ) {
        record_log_skipped();
        return next.run(req).await;
    }
    let Some(buffer) = state.buffer.clone() else {
        record_dropped_unavailable();
        return next.run(req).await;
    };

    let (parts, body) = req.into_parts();
    let (forward, snapshot) =
        capture_body(&parts.headers, body, state.config.body_capture_limit_bytes).await;

    let path = parts.uri.path().to_string();
    let method = parts.method.to_string();
    let form_encoded = is_form_encoded(&parts.headers);
    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip_address = client_ip(&parts.headers, peer);
    let user_id = parts
        .extensions
        .get::<Principal>()
        .map(|principal| principal.user_id.clone());

    let started_at = Instant::now();
    let response = next.run(Request::from_parts(parts, forward)).await;
    let execution_time = ExecutionTime::from_duration(started_at.elapsed());

    let body = match snapshot.decode(form_encoded) {
        RequestBody::Json(value) => RequestBody::Json(redact(&value)),
        undecodable => undecodable,
    };
    let record = ApiLogRecord {
        path,
        user_id,
        body,
        method,
        ip_address,
        status_code: response.status().as_u16(),
        execution_time,
    };
    debug!(
        target: "civic.api_log",
        path = %record.path,
        status = record.status_code,
        execution_time = %record.execution_time,
        "api_log_captured"
    );
    buffer.put_log_data(record).await;
    response
}

/// 请求是否豁免记录。
pub fn should_skip(config: &ApiLogConfig, path: &str, route: Option<&str>, method: &str) -> bool {
    if config.logging_disabled {
        return true;
    }
    if is_under_prefix(path, &config.media_path_prefix)
        || is_under_prefix(path, &config.admin_path_prefix)
    {
        return true;
    }
    route.is_some_and(|route| config.skip_routes.matches(route, method))
}

/// 前缀本身（去掉末尾 `/`）也算在前缀之下，例如 `/admin`。
fn is_under_prefix(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    path.starts_with(prefix) || path == prefix.trim_end_matches('/')
}

/// 用于记录的请求体快照。
#[derive(Debug, Clone, PartialEq)]
pub enum BodySnapshot {
    /// 完整读取且未超过上限。
    Captured(Bytes),
    /// 超过捕获上限，只转发不记录。
    Oversized,
    /// 读取中途出错，错误已原样交给下游。
    Unreadable,
}

impl BodySnapshot {
    pub fn decode(self, form_encoded: bool) -> RequestBody {
        match self {
            BodySnapshot::Captured(bytes) => decode_body(&bytes, form_encoded),
            BodySnapshot::Oversized => RequestBody::Undecodable(OVERSIZED_BODY.to_string()),
            BodySnapshot::Unreadable => RequestBody::Undecodable(UNDECODABLE_BODY.to_string()),
        }
    }
}

/// 逐帧读取请求体，返回转发给下游的 body 与用于记录的快照。
///
/// 最多缓存 `limit` 字节再多一帧：`Content-Length` 声明超限时一帧都不读；
/// 读取中超限时，已读分块接上剩余的流转发，剩余部分不缓存。
/// 读取出错时，已读分块后接同一个错误转发给下游，由 handler 自行决定如何处理。
pub async fn capture_body(
    headers: &HeaderMap,
    mut body: Body,
    limit: usize,
) -> (Body, BodySnapshot) {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return (body, BodySnapshot::Oversized);
    }

    let mut chunks: Vec<Bytes> = Vec::new();
    let mut read = 0usize;
    loop {
        match body.frame().await {
            None => {
                let bytes = Bytes::from(chunks.concat());
                return (Body::from(bytes.clone()), BodySnapshot::Captured(bytes));
            }
            Some(Ok(frame)) => {
                // trailers 不转发
                let Ok(data) = frame.into_data() else {
                    continue;
                };
                read += data.len();
                chunks.push(data);
                if read > limit {
                    let head = stream::iter(chunks.into_iter().map(Ok::<Bytes, axum::Error>));
                    let forward = Body::from_stream(head.chain(body.into_data_stream()));
                    return (forward, BodySnapshot::Oversized);
                }
            }
            Some(Err(err)) => {
                warn!(target: "civic.http", error = %err, read, "request_body_read_failed");
                let replay = chunks
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err::<Bytes, axum::Error>(err)));
                return (Body::from_stream(stream::iter(replay)), BodySnapshot::Unreadable);
            }
        }
    }
}

fn is_form_encoded(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| {
            mime.trim()
                .eq_ignore_ascii_case("application/x-www-form-urlencoded")
        })
}

/// 解析请求体快照。
///
/// 依次尝试 JSON、表单（仅当声明为表单时）、空请求体（视为 `{}`），
/// 都失败时返回占位说明。表单中重复的字段取最后一个值。
pub fn decode_body(bytes: &[u8], form_encoded: bool) -> RequestBody {
    if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
        return RequestBody::Json(value);
    }
    if form_encoded
        && let Ok(pairs) = serde_urlencoded::from_bytes::<Vec<(String, String)>>(bytes)
    {
        let fields: Map<String, Value> = pairs
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        return RequestBody::Json(Value::Object(fields));
    }
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return RequestBody::Json(Value::Object(Map::new()));
    }
    RequestBody::Undecodable(UNDECODABLE_BODY.to_string())
}

/// 解析客户端 IP：优先 `X-Forwarded-For` 第一项，其次对端地址，都没有时为空串。
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty());
    match (forwarded, peer) {
        (Some(first), _) => first.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        (None, None) => String::new(),
    }
}
