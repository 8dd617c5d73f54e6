//! 访问日志链路装配
//!
//! 选择存储后端、创建缓冲区并启动后台刷盘任务；停机时取消任务并等待最后一次刷盘完成。

use civic_auth::JwtManager;
use civic_config::{ApiLogConfig, AppConfig};
use civic_pipeline::{LogBuffer, LogBufferConfig};
use civic_storage::{ApiLogStore, InMemoryApiLogStore, PgApiLogStore, StorageError};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{AccessLogState, AppState};

/// 运行中的访问日志链路：缓冲区句柄与后台刷盘任务。
pub struct ApiLogIngestion {
    buffer: LogBuffer,
    shutdown: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl ApiLogIngestion {
    /// 创建缓冲区并启动后台刷盘任务。
    pub fn start(store: Arc<dyn ApiLogStore>, config: &ApiLogConfig) -> Self {
        let buffer = LogBuffer::from_store(store, buffer_config(config));
        let shutdown = CancellationToken::new();
        let worker = buffer.spawn_flush_worker(shutdown.clone());
        Self {
            buffer,
            shutdown,
            worker,
        }
    }

    pub fn buffer(&self) -> LogBuffer {
        self.buffer.clone()
    }

    /// 停止后台任务；任务退出前会把缓冲区剩余记录刷盘。
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Some(worker) = self.worker
            && let Err(err) = worker.await
        {
            warn!(target: "civic.api_log", error = %err, "api_log_worker_join_failed");
        }
    }
}

pub fn buffer_config(config: &ApiLogConfig) -> LogBufferConfig {
    LogBufferConfig {
        max_buffer_size: config.max_buffer_size,
        flush_interval: config.flush_interval,
        write_timeout: config.write_timeout,
    }
}

/// 按配置选择访问日志存储：配置了数据库地址时使用 Postgres，否则使用内存存储。
pub async fn connect_api_log_store(
    config: &AppConfig,
) -> Result<Arc<dyn ApiLogStore>, StorageError> {
    match &config.database_url {
        Some(url) => {
            let store = PgApiLogStore::connect(url).await?;
            info!(target: "civic.api_log", backend = "postgres", "api_log_store_ready");
            Ok(Arc::new(store))
        }
        None => {
            warn!(
                target: "civic.api_log",
                backend = "in_memory",
                "api_log_store_ready"
            );
            Ok(Arc::new(InMemoryApiLogStore::new()))
        }
    }
}

/// 组装应用状态。
pub fn build_state(config: &AppConfig, buffer: Option<LogBuffer>) -> AppState {
    AppState {
        jwt: Arc::new(JwtManager::new(
            config.jwt_secret.clone(),
            config.jwt_access_ttl_seconds,
        )),
        access_log: AccessLogState::new(buffer, config.api_log.clone()),
    }
}
