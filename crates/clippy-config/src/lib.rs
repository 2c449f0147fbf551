pub mod config;
pub mod manager;

pub use config::{
    Config, ConfigError, ConfigResult, LogLevel, LoggingConfig, RelayConfig, ServerConfig,
};
pub use manager::ConfigManager;

use std::path::PathBuf;

/// 获取 Clippy 配置目录路径
pub fn clippy_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".clippy"))
}

/// 获取默认配置文件路径
pub fn default_config_path() -> Option<PathBuf> {
    clippy_dir().map(|dir| dir.join("config.json"))
}

/// 获取默认日志目录
pub fn default_log_dir() -> Option<PathBuf> {
    clippy_dir().map(|dir| dir.join("logs"))
}

/// 初始化 Clippy 目录结构
pub async fn init_clippy_dirs() -> ConfigResult<()> {
    if let Some(clippy) = clippy_dir() {
        tokio::fs::create_dir_all(&clippy).await?;
    }
    if let Some(logs) = default_log_dir() {
        tokio::fs::create_dir_all(&logs).await?;
    }
    Ok(())
}

/// 展开路径中的 ~ 为用户主目录
pub fn expand_tilde(path: &str) -> Option<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => Some(PathBuf::from(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clippy_dir() {
        if let Some(dir) = clippy_dir() {
            assert!(dir.to_string_lossy().ends_with(".clippy"));
            assert_eq!(default_config_path(), Some(dir.join("config.json")));
            assert_eq!(default_log_dir(), Some(dir.join("logs")));
        }
    }

    #[test]
    fn test_expand_tilde() {
        if let Some(expanded) = expand_tilde("~/.clippy/config.json") {
            assert!(!expanded.to_string_lossy().starts_with('~'));
            assert!(expanded.ends_with(".clippy/config.json"));
        }
        assert_eq!(
            expand_tilde("/etc/clippy.json"),
            Some(PathBuf::from("/etc/clippy.json"))
        );
    }
}
