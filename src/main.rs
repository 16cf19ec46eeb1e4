//! ToS Analyzer 客户端
//!
//! 入口：加载配置、初始化日志、启动会话编排器与 TUI，并运行主循环。

use std::path::PathBuf;

use anyhow::Context;
use tos_analyzer::{
    config::{load_config, AppConfig},
    core::{create_session, Command},
    observability,
    ui::run_app,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 可选参数：配置文件路径
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config_result = load_config(config_path);
    let cfg = config_result.as_ref().cloned().unwrap_or_else(|_| AppConfig::default());

    // 日志：默认 info，可通过 RUST_LOG 覆盖；写入文件，避免干扰 TUI
    if let Err(e) = observability::init(&cfg.app.log_file) {
        observability::init_stderr();
        tracing::warn!("Cannot open log file {}: {}", cfg.app.log_file.display(), e);
    }
    if let Err(e) = &config_result {
        tracing::warn!("Config load failed ({}), using defaults", e);
    }

    // 创建会话：返回命令发送端、状态接收端
    let (cmd_tx, state_rx) = create_session(&cfg).await;

    // 启动 TUI 主循环（消费 state，向 cmd_tx 发送用户意图）
    let result = run_app(state_rx, cmd_tx.clone())
        .await
        .context("App run failed");
    let _ = cmd_tx.send(Command::Quit);
    result
}
