//! 核心编排层：文档源、会话状态、错误、会话监管、会话迁移、主控循环

pub mod document;
pub mod error;
pub mod orchestrator;
pub mod session;
pub mod session_supervisor;
pub mod state;

pub use document::{Document, DocumentInfo, DocumentSource, MimeHint};
pub use error::SessionError;
pub use orchestrator::{create_session, spawn_session, Command};
pub use session::{Session, SessionSettings, CHAT_APOLOGY};
pub use session_supervisor::SessionSupervisor;
pub use state::{
    AnalysisResult, AnalysisStatus, ChatRole, ChatStatus, ChatTurn, Label, LabelCounts,
    SessionState,
};
