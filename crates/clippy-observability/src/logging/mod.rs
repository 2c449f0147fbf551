//! 结构化日志模块
//!
//! 提供基于 tracing 的结构化日志功能。

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::writer::BoxMakeWriter,
    layer::SubscriberExt,
    reload::{self, Handle},
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::config::{Config, LoggingConfig};
use crate::error::{ObservabilityError, Result};

/// 日志级别重新加载句柄类型
type ReloadHandle = Handle<EnvFilter, Registry>;

/// 日志管理器
#[derive(Debug)]
pub struct LogManager {
    /// 配置
    config: LoggingConfig,

    /// 过滤器重新加载句柄
    reload_handle: Option<Arc<RwLock<ReloadHandle>>>,

    /// 文件输出的后台写入线程，drop 时刷新缓冲
    guard: Option<WorkerGuard>,
}

impl LogManager {
    /// 创建并安装全局日志订阅器
    ///
    /// 每个进程只能安装一次，重复调用会返回 [`ObservabilityError::Logging`]。
    pub fn new(config: &Config) -> Result<Self> {
        let mut manager = Self {
            config: config.logging.clone(),
            reload_handle: None,
            guard: None,
        };

        manager.init()?;

        Ok(manager)
    }

    /// 初始化日志系统
    fn init(&mut self) -> Result<()> {
        let filter = Self::build_filter(&self.config)?;
        let (filter, reload_handle) = reload::Layer::new(filter);

        let (writer, guard) = self.build_writer()?;
        let ansi = self.config.ansi_colors && guard.is_none();

        let registry = tracing_subscriber::registry().with(filter);

        let installed = if self.config.json_format {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(self.config.include_target)
                .with_line_number(true)
                .with_file(true)
                .with_ansi(false)
                .with_writer(writer);

            registry.with(layer).try_init()
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_target(self.config.include_target)
                .with_line_number(true)
                .with_ansi(ansi)
                .with_writer(writer);

            registry.with(layer).try_init()
        };
        installed.map_err(|e| {
            ObservabilityError::logging(format!("Failed to install subscriber: {}", e))
        })?;

        self.reload_handle = Some(Arc::new(RwLock::new(reload_handle)));
        self.guard = guard;

        tracing::info!(
            target: "clippy_observability",
            "Log manager initialized with level: {}",
            self.config.level
        );

        Ok(())
    }

    fn build_writer(&self) -> Result<(BoxMakeWriter, Option<WorkerGuard>)> {
        let Some(path) = &self.config.file_path else {
            return Ok((BoxMakeWriter::new(std::io::stdout), None));
        };

        let file_name = path.file_name().ok_or_else(|| {
            ObservabilityError::config(format!("Log file path has no file name: {:?}", path))
        })?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let appender = tracing_appender::rolling::never(dir, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        Ok((BoxMakeWriter::new(writer), Some(guard)))
    }

    /// 构建环境过滤器
    fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
        let mut filter = EnvFilter::try_new(&config.level)
            .map_err(|e| ObservabilityError::logging(format!("Invalid log level: {}", e)))?;

        // 添加模块级别的过滤器
        for (module, level) in &config.module_levels {
            filter = filter.add_directive(
                format!("{}={}", module, level)
                    .parse()
                    .map_err(|e| ObservabilityError::logging(format!("Invalid directive: {}", e)))?,
            );
        }

        Ok(filter)
    }

    /// 动态更新日志级别
    pub fn update_level(&mut self, level: &str) -> Result<()> {
        let new_filter = EnvFilter::try_new(level)
            .map_err(|e| ObservabilityError::logging(format!("Invalid log level: {}", e)))?;

        let Some(handle) = &self.reload_handle else {
            return Err(ObservabilityError::logging("Log manager not initialized"));
        };

        handle
            .write()
            .modify(|filter| *filter = new_filter)
            .map_err(|e| ObservabilityError::logging(format!("Failed to update log level: {}", e)))?;

        self.config.level = level.to_string();

        tracing::info!(
            target: "clippy_observability",
            "Log level updated to: {}",
            level
        );

        Ok(())
    }

    /// 获取当前配置
    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }
}

/// 创建一个订阅连接的 span
pub fn create_connection_span(registry: &str, connection_id: &str) -> tracing::Span {
    tracing::info_span!(
        "connection",
        registry = %registry,
        connection_id = %connection_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter() {
        let config = Config::default()
            .with_log_level("debug")
            .with_module_level("tower_http", "warn");
        assert!(LogManager::build_filter(&config.logging).is_ok());

        let bad = Config::default().with_module_level("tower_http", "loud");
        assert!(matches!(
            LogManager::build_filter(&bad.logging),
            Err(ObservabilityError::Logging { .. })
        ));
    }

    #[test]
    fn test_update_level_requires_init() {
        let mut manager = LogManager {
            config: LoggingConfig::default(),
            reload_handle: None,
            guard: None,
        };

        let err = manager.update_level("debug").unwrap_err();
        assert_eq!(err.category(), "logging");
        assert_eq!(manager.config().level, "info");
    }

    #[test]
    fn test_connection_span_fields() {
        let span = create_connection_span("web", "conn-456");
        assert!(span.metadata().map_or(true, |m| m.name() == "connection"));
    }
}
