use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use clippy_config::ConfigManager;
use clippy_observability::Observability;
use clippy_server::{run_server, AppState};

#[derive(Parser, Debug, Clone)]
#[command(name = "clippy-server")]
#[command(about = "Clippy relay between terminal and browser clients")]
#[command(version)]
struct Cli {
    /// Server port (overrides config)
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Bind host (overrides config)
    #[arg(long, env = "CLIPPY_HOST")]
    host: Option<String>,

    /// Log level or filter directive (overrides config)
    #[arg(long, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long, default_value = "false")]
    json_logs: bool,

    /// Config file path (defaults to ~/.clippy/config.json)
    #[arg(long, env = "CLIPPY_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化 Clippy 目录结构
    if let Err(e) = clippy_config::init_clippy_dirs().await {
        eprintln!("Warning: Failed to init clippy directories: {}", e);
    }

    // 加载配置
    let config_manager = match &cli.config {
        Some(path) => {
            let config_path =
                clippy_config::expand_tilde(path).unwrap_or_else(|| PathBuf::from(path));
            ConfigManager::load(&config_path)
                .await
                .with_context(|| format!("Failed to load config from {:?}", config_path))?
        }
        None => ConfigManager::load_default()
            .await
            .context("Failed to load default config")?,
    };
    let mut config = config_manager.snapshot().await;

    // CLI 参数覆盖配置文件
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    ConfigManager::validate(&config)?;

    // 初始化日志和指标
    let mut obs_config = clippy_observability::Config::from(&config);
    if let Some(level) = cli.log_level {
        obs_config = obs_config.with_log_level(level);
    }
    if cli.json_logs {
        obs_config = obs_config.with_json_format(true);
    }
    let observability = Observability::init(obs_config)?;

    tracing::info!("Config loaded from {:?}", config_manager.path());
    tracing::info!("Starting Clippy relay on {}", config.bind_addr());
    tracing::debug!("  CORS: {}", config.server.cors);
    tracing::debug!("  Keep-alive: {}s", config.relay.keep_alive_secs);

    let state = AppState::new(config).with_metrics(observability.metrics());

    run_server(state).await
}
