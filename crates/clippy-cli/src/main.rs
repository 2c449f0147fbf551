mod client;
mod render;
mod session;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use clippy_core::{ClearScope, Message, MessageKind, Priority};
use colored::Colorize;

use crate::client::RelayClient;

#[derive(Parser)]
#[command(name = "clippy")]
#[command(about = "Send messages to and listen for replies from the Clippy relay")]
#[command(version)]
struct Cli {
    #[arg(long, env = "CLIPPY_SERVER_URL", default_value = "http://localhost:3000")]
    server_url: String,

    /// Tag published messages with this session
    #[arg(long, global = true)]
    session_id: Option<String>,

    /// Enable debug mode
    #[arg(long, short, default_value = "false")]
    debug: bool,

    /// Config file path
    #[arg(long, env = "CLIPPY_CONFIG", default_value = "~/.clippy/config.json")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 发送消息
    Send {
        /// 消息内容
        #[arg(required = true)]
        text: Vec<String>,
        #[arg(long)]
        priority: Option<Priority>,
    },
    /// 发送输入中提示
    Typing {
        /// 当前输入
        #[arg(default_value = "")]
        text: String,
        /// Replace the receiver's typing text instead of marking it incremental
        #[arg(long, default_value = "false")]
        replace: bool,
    },
    /// 清空浏览器端历史
    Clear {
        /// all | typing | session
        #[arg(long, default_value = "all", value_parser = parse_scope)]
        scope: ClearScope,
    },
    /// 发送命令
    Command {
        /// 命令名
        name: String,
        /// 命令参数
        args: Vec<String>,
        /// Display text (defaults to the command line)
        #[arg(long)]
        text: Option<String>,
    },
    /// 报告错误
    Error {
        /// 错误描述
        text: String,
        #[arg(long)]
        code: Option<String>,
        #[arg(long, default_value = "false")]
        retryable: bool,
    },
    /// 监听浏览器端消息
    Listen,
    /// 启动交互式聊天
    Chat,
    /// 配置管理命令
    Config(ConfigArgs),
}

#[derive(Args, Clone)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// 获取配置值
    Get {
        /// 配置键 (如: server.port, relay.typing_idle_ms)
        key: String,
    },
    /// 设置配置值
    Set {
        /// 配置键 (如: server.port, relay.typing_idle_ms)
        key: String,
        /// 配置值
        value: String,
    },
    /// 初始化默认配置
    Init {
        /// 强制覆盖已有配置
        #[arg(long, default_value = "false")]
        force: bool,
    },
    /// 显示当前配置
    Show,
}

fn parse_scope(s: &str) -> Result<ClearScope, String> {
    s.parse()
}

/// The message a one-shot publishing subcommand stands for
fn message_for(command: &Commands) -> Option<Message> {
    let message = match command {
        Commands::Send { text, priority } => {
            let message = Message::message(text.join(" "));
            match priority {
                Some(priority) => message.with_priority(*priority),
                None => message,
            }
        }
        Commands::Typing { text, replace } => Message::typing(text.clone(), !replace),
        Commands::Clear { scope } => Message::clear(scope.clone()),
        Commands::Command { name, args, text } => {
            let text = text.clone().unwrap_or_else(|| {
                std::iter::once(name.as_str())
                    .chain(args.iter().map(String::as_str))
                    .collect::<Vec<_>>()
                    .join(" ")
            });
            let args = (!args.is_empty()).then(|| args.clone());
            Message::command(text, name.clone(), args)
        }
        Commands::Error {
            text,
            code,
            retryable,
        } => Message::error(text.clone(), code.clone(), *retryable),
        Commands::Listen | Commands::Chat | Commands::Config(_) => return None,
    };
    Some(message)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.debug {
        eprintln!("{}", "[DEBUG] Debug mode enabled".dimmed());
        eprintln!("{}", format!("[DEBUG] Server URL: {}", cli.server_url).dimmed());
    }

    let client = RelayClient::new(&cli.server_url, cli.debug);

    if let Some(message) = message_for(&cli.command) {
        let message = match &cli.session_id {
            Some(id) => message.with_session(id.clone()),
            None => message,
        };
        return publish(&client, message).await;
    }

    match cli.command {
        Commands::Listen => session::listen(&client).await,
        Commands::Chat => {
            let session_id = cli
                .session_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let idle = typing_idle(&cli.config, cli.debug).await;
            session::chat(&client, Some(session_id), idle).await
        }
        Commands::Config(args) => handle_config(args, &cli.config, cli.debug).await,
        _ => Ok(()),
    }
}

async fn publish(client: &RelayClient, message: Message) -> anyhow::Result<()> {
    let session_clear = matches!(
        &message.kind,
        MessageKind::Clear {
            clear_scope: Some(ClearScope::Session)
        }
    );
    if session_clear && message.session_id.is_none() {
        println!(
            "{}",
            "⚠️  A session clear without --session-id only removes untagged history".yellow()
        );
    }

    println!(
        "{}",
        format!("🚀 Sending {}: {}", message.message_type(), render::entry_text(&message)).cyan()
    );

    match client.publish(&message).await {
        Ok(ack) => {
            println!(
                "{}",
                format!("✅ {} ({})", ack.message_type, render::delivered(ack.connections)).green()
            );
            Ok(())
        }
        Err(e) => {
            println!("{}", format!("❌ {}", e).red());
            std::process::exit(1);
        }
    }
}

fn config_path(config: &str) -> PathBuf {
    clippy_config::expand_tilde(config).unwrap_or_else(|| PathBuf::from(config))
}

/// Typing idle timeout from the config file, or the default
async fn typing_idle(config: &str, debug: bool) -> Duration {
    let path = config_path(config);
    let idle_ms = if path.exists() {
        match clippy_config::ConfigManager::load(&path).await {
            Ok(manager) => manager.snapshot().await.relay.typing_idle_ms,
            Err(e) => {
                eprintln!("{}", format!("⚠️  Ignoring config {:?}: {}", path, e).yellow());
                clippy_config::RelayConfig::default().typing_idle_ms
            }
        }
    } else {
        clippy_config::RelayConfig::default().typing_idle_ms
    };

    if debug {
        eprintln!("{}", format!("[DEBUG] Typing idle timeout: {}ms", idle_ms).dimmed());
    }
    Duration::from_millis(idle_ms)
}

async fn handle_config(args: ConfigArgs, config_path_arg: &str, debug: bool) -> anyhow::Result<()> {
    use clippy_config::{Config, ConfigManager};

    let config_path = config_path(config_path_arg);

    if debug {
        eprintln!("{}", format!("[DEBUG] Config path: {:?}", config_path).dimmed());
    }

    match args.command {
        ConfigCommands::Get { key } => {
            let manager = ConfigManager::load(&config_path).await?;
            let config = manager.get().read().await.clone();

            match config.get_value(&key) {
                Some(value) => {
                    println!("{}", format!("{} = {}", key, value).green());
                }
                None => {
                    println!("{}", format!("❌ Key not found: {}", key).red());
                    std::process::exit(1);
                }
            }
        }
        ConfigCommands::Set { key, value } => {
            let manager = ConfigManager::load(&config_path).await?;

            let mut candidate = manager.snapshot().await;
            if let Err(e) = candidate.set_value(&key, &value) {
                eprintln!("{}", format!("❌ Failed to set value: {}", e).red());
                std::process::exit(1);
            }
            manager.update(|config| *config = candidate).await?;

            println!("{}", format!("✅ Set {} = {}", key, value).green());
        }
        ConfigCommands::Init { force } => {
            if config_path.exists() && !force {
                println!("{}", format!("⚠️  Config already exists at {:?}", config_path).yellow());
                println!("{}", "Use --force to overwrite".dimmed());
                return Ok(());
            }

            clippy_config::init_clippy_dirs().await?;

            let manager = ConfigManager::new(Config::default(), config_path.clone());
            manager.save().await?;

            println!("{}", format!("✅ Config initialized at {:?}", config_path).green());
            println!("{}", "You can edit this file to customize your settings".dimmed());
        }
        ConfigCommands::Show => {
            let manager = ConfigManager::load(&config_path).await?;
            let config = manager.get().read().await.clone();

            println!("{}", "📋 Current Configuration:".cyan().bold());
            println!();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
