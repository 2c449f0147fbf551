use std::sync::Arc;
use std::time::Duration;

use clippy_config::Config;
use clippy_observability::MetricsCollector;
use tokio_util::sync::CancellationToken;

use crate::registry::ConnectionRegistry;

/// Label of the browser-side population
pub const WEB: &str = "web";
/// Label of the terminal-side population
pub const CLI: &str = "cli";

/// 应用状态 - 在 main.rs 中创建并共享给所有 handler
#[derive(Clone)]
pub struct AppState {
    /// Web 订阅者（接收 CLI 发布的消息）
    pub web: Arc<ConnectionRegistry>,
    /// CLI 订阅者（接收 Web 发布的消息）
    pub cli: Arc<ConnectionRegistry>,
    /// 启动时的配置快照
    pub config: Arc<Config>,
    /// Prometheus 指标，未安装 recorder 时为空
    pub metrics: Option<Arc<MetricsCollector>>,
    /// 关闭时取消，用于结束所有订阅流
    pub shutdown: CancellationToken,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(config: Config) -> Self {
        Self {
            web: Arc::new(ConnectionRegistry::new(WEB)),
            cli: Arc::new(ConnectionRegistry::new(CLI)),
            config: Arc::new(config),
            metrics: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// 挂载指标收集器
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// SSE keep-alive 间隔
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.config.relay.keep_alive_secs.max(1))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
