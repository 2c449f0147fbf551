//! 指标收集模块
//!
//! 提供基于 metrics 库的指标收集功能。没有安装 recorder 时，
//! [`RelayMetrics`] 的所有记录调用都是空操作。

use metrics::{describe_counter, describe_gauge, Unit};
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::MetricsConfig;
use crate::error::Result;
#[cfg(feature = "prometheus")]
use crate::error::ObservabilityError;

/// 发布成功的消息数
pub const MESSAGES_PUBLISHED: &str = "clippy_messages_published_total";
/// 被拒绝的发布请求数
pub const MESSAGES_REJECTED: &str = "clippy_messages_rejected_total";
/// 因写入失败被移除的连接数
pub const CONNECTIONS_PRUNED: &str = "clippy_connections_pruned_total";
/// 当前活跃的订阅连接数
pub const CONNECTIONS_ACTIVE: &str = "clippy_connections_active";

/// 指标收集器
pub struct MetricsCollector {
    /// Prometheus 句柄
    #[cfg(feature = "prometheus")]
    handle: Option<PrometheusHandle>,

    /// 配置
    config: MetricsConfig,

    /// 是否已初始化
    initialized: bool,
}

impl std::fmt::Debug for MetricsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsCollector")
            .field("config", &self.config)
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl MetricsCollector {
    /// 创建新的指标收集器，并在启用时安装全局 recorder
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        let mut collector = Self {
            #[cfg(feature = "prometheus")]
            handle: None,
            config: config.clone(),
            initialized: false,
        };

        collector.init()?;

        Ok(collector)
    }

    /// 初始化指标收集器
    fn init(&mut self) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        #[cfg(feature = "prometheus")]
        if self.config.prometheus_enabled {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();

            metrics::set_global_recorder(recorder).map_err(|e| {
                ObservabilityError::metrics(format!("Failed to set global recorder: {}", e))
            })?;

            self.handle = Some(handle);
        }

        register_descriptions();

        self.initialized = true;

        tracing::info!(
            target: "clippy_observability",
            "Metrics collector initialized"
        );

        Ok(())
    }

    /// 是否已安装 recorder
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// 获取 Prometheus 格式的指标
    pub fn render(&self) -> String {
        #[cfg(feature = "prometheus")]
        {
            self.handle
                .as_ref()
                .map(|h| h.render())
                .unwrap_or_default()
        }
        #[cfg(not(feature = "prometheus"))]
        {
            String::new()
        }
    }
}

/// 注册指标描述
fn register_descriptions() {
    describe_counter!(
        MESSAGES_PUBLISHED,
        Unit::Count,
        "Messages accepted and broadcast, by direction"
    );
    describe_counter!(
        MESSAGES_REJECTED,
        Unit::Count,
        "Publish requests rejected before broadcast, by reason"
    );
    describe_counter!(
        CONNECTIONS_PRUNED,
        Unit::Count,
        "Subscriptions removed after a failed write, by registry"
    );
    describe_gauge!(
        CONNECTIONS_ACTIVE,
        Unit::Count,
        "Live subscriptions, by registry"
    );
}

/// Relay 指标记录器
pub struct RelayMetrics;

impl RelayMetrics {
    /// 记录一次成功的发布
    pub fn record_published(direction: &'static str) {
        metrics::counter!(MESSAGES_PUBLISHED, "direction" => direction).increment(1);
    }

    /// 记录一次被拒绝的发布
    pub fn record_rejected(reason: &'static str) {
        metrics::counter!(MESSAGES_REJECTED, "reason" => reason).increment(1);
    }

    /// 记录广播时移除的失效连接
    pub fn record_pruned(registry: &'static str, count: usize) {
        if count > 0 {
            metrics::counter!(CONNECTIONS_PRUNED, "registry" => registry).increment(count as u64);
        }
    }

    /// 设置活跃连接数
    pub fn set_active(registry: &'static str, count: usize) {
        metrics::gauge!(CONNECTIONS_ACTIVE, "registry" => registry).set(count as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_collector_renders_nothing() {
        let config = MetricsConfig {
            enabled: false,
            prometheus_enabled: true,
        };
        let collector = MetricsCollector::new(&config).unwrap();
        assert!(!collector.is_initialized());
        assert_eq!(collector.render(), "");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        RelayMetrics::record_published("cli_to_web");
        RelayMetrics::record_rejected("missing_type");
        RelayMetrics::record_pruned("web", 2);
        RelayMetrics::set_active("cli", 0);
    }

    #[cfg(feature = "prometheus")]
    #[test]
    fn test_relay_metrics_render() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            register_descriptions();
            RelayMetrics::record_published("cli_to_web");
            RelayMetrics::record_published("cli_to_web");
            RelayMetrics::record_rejected("missing_text");
            RelayMetrics::record_pruned("web", 0);
            RelayMetrics::record_pruned("cli", 3);
            RelayMetrics::set_active("web", 2);
        });

        let output = handle.render();
        assert!(output.contains(r#"clippy_messages_published_total{direction="cli_to_web"} 2"#));
        assert!(output.contains(r#"clippy_messages_rejected_total{reason="missing_text"} 1"#));
        assert!(output.contains(r#"clippy_connections_pruned_total{registry="cli"} 3"#));
        assert!(!output.contains(r#"registry="web"} 0"#));
        assert!(output.contains(r#"clippy_connections_active{registry="web"} 2"#));
    }
}
