//! civic HTTP 服务入口：加载配置、启动访问日志链路、监听 HTTP，ctrl_c 后优雅退出。

use civic_api::{bootstrap, routes};
use civic_config::AppConfig;
use civic_telemetry::init_tracing;
use std::net::SocketAddr;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    init_tracing();

    let store = bootstrap::connect_api_log_store(&config).await?;
    let ingestion = bootstrap::ApiLogIngestion::start(store, &config.api_log);
    let state = bootstrap::build_state(&config, Some(ingestion.buffer()));
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(target: "civic.http", addr = %config.http_addr, "http_listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // HTTP 已停止接收请求，再停刷盘任务，保证最后一批记录落库
    ingestion.shutdown().await;
    info!(target: "civic.http", "http_stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(target: "civic.http", error = %err, "shutdown_signal_unavailable");
        std::future::pending::<()>().await;
    }
    info!(target: "civic.http", "shutdown_requested");
}
