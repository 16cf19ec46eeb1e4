//! ToS Analyzer - 条款风险分析客户端
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 文档源、会话状态、会话迁移、过期请求监管、主控循环
//! - **observability**: tracing 日志初始化
//! - **service**: 分析服务抽象与实现（HTTP / Mock）
//! - **ui**: Ratatui TUI 界面

pub mod config;
pub mod core;
pub mod observability;
pub mod service;
pub mod ui;

pub use crate::core::{Command, Session, SessionState};
pub use crate::service::{AnalysisService, HttpAnalysisService, MockAnalysisService};
