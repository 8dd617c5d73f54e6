//! 追踪、请求 ID 与访问日志链路计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 指标快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
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

/// 访问日志链路计数器。
pub struct TelemetryMetrics {
    logs_enqueued: AtomicU64,
    logs_skipped: AtomicU64,
    dropped_unavailable: AtomicU64,
    flushes: AtomicU64,
    capacity_flushes: AtomicU64,
    records_written: AtomicU64,
    write_failure: AtomicU64,
    write_timeout: AtomicU64,
    write_latency_ms_total: AtomicU64,
    write_latency_ms_count: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            logs_enqueued: AtomicU64::new(0),
            logs_skipped: AtomicU64::new(0),
            dropped_unavailable: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            capacity_flushes: AtomicU64::new(0),
            records_written: AtomicU64::new(0),
            write_failure: AtomicU64::new(0),
            write_timeout: AtomicU64::new(0),
            write_latency_ms_total: AtomicU64::new(0),
            write_latency_ms_count: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            logs_enqueued: self.logs_enqueued.load(Ordering::Relaxed),
            logs_skipped: self.logs_skipped.load(Ordering::Relaxed),
            dropped_unavailable: self.dropped_unavailable.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            capacity_flushes: self.capacity_flushes.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            write_failure: self.write_failure.load(Ordering::Relaxed),
            write_timeout: self.write_timeout.load(Ordering::Relaxed),
            write_latency_ms_total: self.write_latency_ms_total.load(Ordering::Relaxed),
            write_latency_ms_count: self.write_latency_ms_count.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录入队的访问日志条数。
pub fn record_log_enqueued() {
    metrics().logs_enqueued.fetch_add(1, Ordering::Relaxed);
}

/// 记录命中跳过规则的请求数。
pub fn record_log_skipped() {
    metrics().logs_skipped.fetch_add(1, Ordering::Relaxed);
}

/// 记录缓冲区不可用时丢弃的日志数。
pub fn record_dropped_unavailable() {
    metrics().dropped_unavailable.fetch_add(1, Ordering::Relaxed);
}

/// 记录一次非空刷盘。
pub fn record_flush() {
    metrics().flushes.fetch_add(1, Ordering::Relaxed);
}

/// 记录缓冲区满触发的同步刷盘。
pub fn record_capacity_flush() {
    metrics().capacity_flushes.fetch_add(1, Ordering::Relaxed);
}

/// 记录成功写入的日志条数。
pub fn record_records_written(count: u64) {
    metrics().records_written.fetch_add(count, Ordering::Relaxed);
}

/// 记录批量写入失败次数。
pub fn record_write_failure() {
    metrics().write_failure.fetch_add(1, Ordering::Relaxed);
}

/// 记录批量写入超时次数（同时计入失败）。
pub fn record_write_timeout() {
    let metrics = metrics();
    metrics.write_timeout.fetch_add(1, Ordering::Relaxed);
    metrics.write_failure.fetch_add(1, Ordering::Relaxed);
}

/// 记录写入延迟（毫秒）。
pub fn record_write_latency_ms(latency_ms: u64) {
    let metrics = metrics();
    metrics
        .write_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
    metrics
        .write_latency_ms_count
        .fetch_add(1, Ordering::Relaxed);
}
