//! Clippy Observability Infrastructure
//!
//! 提供统一的日志和指标功能。

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::Config;
pub use error::{ObservabilityError, Result};
pub use logging::LogManager;
pub use metrics::{MetricsCollector, RelayMetrics};

use parking_lot::RwLock;
use std::sync::Arc;

/// 统一的观测性句柄
#[derive(Debug)]
pub struct Observability {
    /// 日志管理器
    log_manager: Arc<RwLock<LogManager>>,
    /// 指标收集器
    metrics: Arc<MetricsCollector>,
    /// 配置
    config: Config,
}

impl Observability {
    /// 初始化观测性基础设施
    pub fn init(config: Config) -> Result<Self> {
        let log_manager = Arc::new(RwLock::new(LogManager::new(&config)?));
        let metrics = Arc::new(MetricsCollector::new(&config.metrics)?);

        tracing::info!(
            target: "clippy_observability",
            "Observability infrastructure initialized"
        );

        Ok(Self {
            log_manager,
            metrics,
            config,
        })
    }

    /// 获取日志管理器
    pub fn log_manager(&self) -> Arc<RwLock<LogManager>> {
        Arc::clone(&self.log_manager)
    }

    /// 获取指标收集器
    pub fn metrics(&self) -> Arc<MetricsCollector> {
        Arc::clone(&self.metrics)
    }

    /// 获取配置
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 动态更新日志级别
    pub fn update_log_level(&self, level: &str) -> Result<()> {
        self.log_manager.write().update_level(level)
    }
}

/// 便捷导入模块
pub mod prelude {
    //! 常用类型的便捷导入

    pub use crate::{Config, Observability, RelayMetrics, Result};

    // 日志
    pub use tracing::{debug, error, info, instrument, trace, warn, Span};
}
