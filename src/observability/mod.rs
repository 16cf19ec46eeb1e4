//! 可观测性：tracing 日志初始化
//!
//! 默认 info，可通过 RUST_LOG 覆盖；TUI 占用终端，日志写入文件。

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 日志追加写入 log_file
pub fn init(log_file: &Path) -> std::io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .init();
    Ok(())
}

/// 日志输出到 stderr（无终端界面时使用）
pub fn init_stderr() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
