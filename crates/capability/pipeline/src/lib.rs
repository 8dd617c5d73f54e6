//! 访问日志缓冲与批量落库。
//!
//! 请求任务通过 [`LogBuffer::put_log_data`] 入队；后台任务按固定周期刷盘，
//! 缓冲区达到容量时由入队的请求任务同步刷盘（背压）。
//!
//! 投递语义为至多一次：写入失败或超时的批次直接丢弃，不会回填缓冲区。

use async_trait::async_trait;
use civic_storage::ApiLogStore;
use civic_telemetry::{
    record_capacity_flush, record_flush, record_log_enqueued, record_records_written,
    record_write_failure, record_write_latency_ms, record_write_timeout,
};
use domain::ApiLogRecord;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};

/// 写入链路错误。
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("writer error: {0}")]
    Writer(String),
    #[error("write timed out after {0:?}")]
    Timeout(Duration),
}

/// 缓冲区参数。
#[derive(Debug, Clone)]
pub struct LogBufferConfig {
    pub max_buffer_size: usize,
    pub flush_interval: Duration,
    pub write_timeout: Duration,
}

impl Default for LogBufferConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: 100,
            flush_interval: Duration::from_secs(5),
            write_timeout: Duration::from_secs(10),
        }
    }
}

impl LogBufferConfig {
    fn sanitized(mut self) -> Self {
        if self.max_buffer_size == 0 {
            self.max_buffer_size = 1;
        }
        // interval 不接受零周期
        if self.flush_interval.is_zero() {
            self.flush_interval = Duration::from_millis(1);
        }
        if self.write_timeout.is_zero() {
            self.write_timeout = Duration::from_millis(1);
        }
        self
    }
}

/// 批量写入器抽象。
#[async_trait]
pub trait ApiLogWriter: Send + Sync {
    /// 写入一批日志，返回写入条数。
    async fn write_batch(&self, records: &[ApiLogRecord]) -> Result<usize, PipelineError>;
}

/// 基于存储层的写入器。
#[derive(Clone)]
pub struct StoreApiLogWriter {
    store: Arc<dyn ApiLogStore>,
}

impl StoreApiLogWriter {
    pub fn new(store: Arc<dyn ApiLogStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ApiLogWriter for StoreApiLogWriter {
    async fn write_batch(&self, records: &[ApiLogRecord]) -> Result<usize, PipelineError> {
        self.store
            .bulk_insert(records)
            .await
            .map_err(|err| PipelineError::Writer(err.to_string()))
    }
}

/// 刷盘触发来源。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// 缓冲区达到容量。
    Capacity,
    /// 后台周期。
    Interval,
    /// 停止信号后的最后一次刷盘。
    Shutdown,
    /// 显式调用 [`LogBuffer::flush`]。
    Manual,
}

impl FlushTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushTrigger::Capacity => "capacity",
            FlushTrigger::Interval => "interval",
            FlushTrigger::Shutdown => "shutdown",
            FlushTrigger::Manual => "manual",
        }
    }
}

/// 单次刷盘结果。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushOutcome {
    /// 从缓冲区取出的条数。
    pub drained: usize,
    /// 成功写入的条数；写入失败时为 0。
    pub written: usize,
    /// 写入耗时，与超时使用同一时钟（tokio）。
    pub latency: Duration,
}

impl FlushOutcome {
    pub fn failed(&self) -> bool {
        self.drained > 0 && self.written == 0
    }
}

struct LogBufferInner {
    writer: Arc<dyn ApiLogWriter>,
    config: LogBufferConfig,
    buffer: Mutex<Vec<ApiLogRecord>>,
    worker_started: AtomicBool,
}

/// 访问日志缓冲区句柄。
///
/// 克隆得到的句柄共享同一缓冲区；由启动流程创建一次并注入各中间件。
#[derive(Clone)]
pub struct LogBuffer {
    inner: Arc<LogBufferInner>,
}

impl LogBuffer {
    pub fn new(writer: Arc<dyn ApiLogWriter>, config: LogBufferConfig) -> Self {
        let config = config.sanitized();
        let inner = LogBufferInner {
            writer,
            buffer: Mutex::new(Vec::with_capacity(config.max_buffer_size)),
            config,
            worker_started: AtomicBool::new(false),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// 直接基于存储层创建。
    pub fn from_store(store: Arc<dyn ApiLogStore>, config: LogBufferConfig) -> Self {
        Self::new(Arc::new(StoreApiLogWriter::new(store)), config)
    }

    pub fn config(&self) -> &LogBufferConfig {
        &self.inner.config
    }

    /// 当前待刷盘条数。
    pub async fn pending(&self) -> usize {
        self.inner.buffer.lock().await.len()
    }

    /// 入队一条日志。
    ///
    /// 入队后若达到容量，在当前任务内同步刷盘后再返回。
    /// 不向调用方返回任何错误。
    pub async fn put_log_data(&self, record: ApiLogRecord) {
        let batch = {
            let mut buffer = self.inner.buffer.lock().await;
            buffer.push(record);
            record_log_enqueued();
            if buffer.len() < self.inner.config.max_buffer_size {
                return;
            }
            std::mem::take(&mut *buffer)
        };
        record_capacity_flush();
        self.write(batch, FlushTrigger::Capacity).await;
    }

    /// 立即刷盘。
    pub async fn flush(&self) -> FlushOutcome {
        self.flush_with(FlushTrigger::Manual).await
    }

    async fn flush_with(&self, trigger: FlushTrigger) -> FlushOutcome {
        let batch = std::mem::take(&mut *self.inner.buffer.lock().await);
        self.write(batch, trigger).await
    }

    /// 写入已取出的批次；锁已释放，生产者不会被存储 I/O 阻塞。
    async fn write(&self, batch: Vec<ApiLogRecord>, trigger: FlushTrigger) -> FlushOutcome {
        if batch.is_empty() {
            return FlushOutcome::default();
        }
        let drained = batch.len();
        let write_timeout = self.inner.config.write_timeout;
        let started_at = time::Instant::now();
        let result = time::timeout(write_timeout, self.inner.writer.write_batch(&batch))
            .await
            .unwrap_or(Err(PipelineError::Timeout(write_timeout)));
        let latency = started_at.elapsed();

        match result {
            Ok(written) => {
                record_flush();
                record_records_written(written as u64);
                record_write_latency_ms(latency.as_millis() as u64);
                info!(
                    target: "civic.api_log",
                    trigger = trigger.as_str(),
                    records = drained,
                    written = written,
                    "api_log_flushed"
                );
                FlushOutcome {
                    drained,
                    written,
                    latency,
                }
            }
            Err(err @ PipelineError::Timeout(_)) => {
                record_write_timeout();
                warn!(
                    target: "civic.api_log",
                    trigger = trigger.as_str(),
                    records = drained,
                    error = %err,
                    "api_log_write_timeout"
                );
                FlushOutcome {
                    drained,
                    written: 0,
                    latency,
                }
            }
            Err(err) => {
                record_write_failure();
                warn!(
                    target: "civic.api_log",
                    trigger = trigger.as_str(),
                    records = drained,
                    error = %err,
                    "api_log_write_failed"
                );
                FlushOutcome {
                    drained,
                    written: 0,
                    latency,
                }
            }
        }
    }

    /// 启动后台刷盘任务。
    ///
    /// 每个缓冲区只允许一个刷盘任务，重复调用返回 `None`。
    /// `shutdown` 取消后执行最后一次刷盘再退出。
    pub fn spawn_flush_worker(&self, shutdown: CancellationToken) -> Option<JoinHandle<()>> {
        if self.inner.worker_started.swap(true, Ordering::AcqRel) {
            warn!(target: "civic.api_log", "api_log_worker_already_running");
            return None;
        }
        let buffer = self.clone();
        let span = info_span!("api_log_flusher");
        Some(tokio::spawn(
            async move { buffer.run_flush_loop(shutdown).await }.instrument(span),
        ))
    }

    async fn run_flush_loop(&self, shutdown: CancellationToken) {
        let period = self.inner.config.flush_interval;
        let mut ticker = time::interval_at(time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            target: "civic.api_log",
            flush_interval_ms = period.as_millis() as u64,
            max_buffer_size = self.inner.config.max_buffer_size,
            "api_log_worker_started"
        );
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    let outcome = self.flush_with(FlushTrigger::Shutdown).await;
                    info!(
                        target: "civic.api_log",
                        records = outcome.drained,
                        "api_log_worker_stopped"
                    );
                    break;
                }
                _ = ticker.tick() => {
                    self.flush_with(FlushTrigger::Interval).await;
                }
            }
        }
    }
}
