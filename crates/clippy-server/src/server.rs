//! HTTP Server - 提供 relay 的 SSE 订阅和发布接口

use std::future::Future;
use std::net::SocketAddr;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::relay;
use crate::state::AppState;

/// 创建路由
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        // 健康检查
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        // relay
        .route(
            "/api/clippy",
            get(relay::web_subscribe).post(relay::cli_publish),
        )
        .route(
            "/api/clippy/stream",
            get(relay::cli_subscribe).post(relay::web_publish),
        )
        // 中间件
        .layer(TraceLayer::new_for_http());

    let router = if state.config.server.cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE]),
        )
    } else {
        router
    };

    router.with_state(state)
}

/// 在给定的 listener 上运行服务器，`signal` 完成后优雅关闭
pub async fn serve<F>(listener: TcpListener, state: AppState, signal: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let shutdown = state.shutdown.clone();
    let app = create_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            // open subscription streams would otherwise hold the server open
            shutdown.cancel();
        })
        .await?;

    Ok(())
}

/// 运行 HTTP 服务器，直到收到 Ctrl-C
pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = state
        .config
        .bind_addr()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Clippy relay listening on http://{}", listener.local_addr()?);

    serve(listener, state, shutdown_signal()).await?;

    tracing::info!("Clippy relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// 健康检查处理器
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "webConnections": state.web.len(),
        "cliConnections": state.cli.len(),
    }))
}

/// Prometheus 指标处理器
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = state
        .metrics
        .as_ref()
        .map(|metrics| metrics.render())
        .unwrap_or_default();

    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        )],
        body,
    )
}
