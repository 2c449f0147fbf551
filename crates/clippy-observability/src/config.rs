//! 观测性配置
//!
//! 可以直接构造，也可以从 clippy-config 的主配置转换而来。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// 观测性配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,

    /// 指标配置
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// 设置日志级别
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.logging.level = level.into();
        self
    }

    /// 设置是否使用 JSON 格式
    pub fn with_json_format(mut self, json: bool) -> Self {
        self.logging.json_format = json;
        self
    }

    /// 设置日志文件路径
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.logging.file_path = Some(path.into());
        self
    }

    /// 添加模块特定的日志级别
    pub fn with_module_level(mut self, module: impl Into<String>, level: impl Into<String>) -> Self {
        self.logging.module_levels.insert(module.into(), level.into());
        self
    }

    /// 启用或关闭指标收集
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics.enabled = enabled;
        self
    }
}

impl From<&clippy_config::Config> for Config {
    fn from(config: &clippy_config::Config) -> Self {
        Self {
            logging: LoggingConfig {
                level: config.logging.level.to_string(),
                json_format: config.logging.json,
                file_path: config
                    .logging
                    .file
                    .as_deref()
                    .and_then(clippy_config::expand_tilde),
                ..LoggingConfig::default()
            },
            metrics: MetricsConfig::default(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别或完整的 EnvFilter 指令（例如 `info,tower_http=debug`）
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否使用 JSON 格式
    #[serde(default)]
    pub json_format: bool,

    /// 日志文件路径，未设置时输出到 stdout
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// 模块级别的日志配置
    #[serde(default)]
    pub module_levels: HashMap<String, String>,

    /// 是否启用 ANSI 颜色
    #[serde(default = "default_true")]
    pub ansi_colors: bool,

    /// 是否包含目标（target）
    #[serde(default = "default_true")]
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
            module_levels: HashMap::new(),
            ansi_colors: true,
            include_target: true,
        }
    }
}

/// 指标配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// 是否启用指标收集
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// 是否启用 Prometheus 导出器
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prometheus_enabled: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert!(config.logging.file_path.is_none());
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_config_builder() {
        let config = Config::default()
            .with_log_level("debug")
            .with_json_format(true)
            .with_module_level("tower_http", "warn")
            .with_metrics(false);

        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
        assert_eq!(
            config.logging.module_levels.get("tower_http"),
            Some(&"warn".to_string())
        );
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_from_clippy_config() {
        let mut clippy = clippy_config::Config::default();
        clippy.logging.level = clippy_config::LogLevel::Debug;
        clippy.logging.json = true;
        clippy.logging.file = Some("/var/log/clippy/relay.log".to_string());

        let config = Config::from(&clippy);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
        assert_eq!(
            config.logging.file_path,
            Some(PathBuf::from("/var/log/clippy/relay.log"))
        );
    }
}
